//! # Correlation Store
//!
//! The facade UI containers talk to. Owns the correlation index, the color
//! provider, the level state machine and the rule repository, and exposes
//! the query/command surface over them.
//!
//! The store is constructed explicitly and handed to whoever needs it.
//! Fixture data is injected as an index like any other; the store never
//! generates data itself.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::colors::ColorProvider;
use crate::filters::FilterItem;
use crate::graph::{
    build_graph, CorrelationGraphData, CorrelationLevel, DoubleClickAction, EventBindings, GraphEvent,
    LevelKind,
};
use crate::index::FindingCorrelationIndex;
use crate::level::{CorrelationLevelStateMachine, FetchTicket, GraphUpdateHandler, Subscription};
use crate::rules::{
    filter_rules_by_log_types, CorrelationRule, CorrelationRuleTableItem, InMemoryRuleRepository,
    RuleRepository,
};
use crate::source::FindingsSource;
use crate::window::{RecentWindows, TimeWindow};
use crate::{CorrelationError, CorrelationResult, CorrelationScore, CorrelationsConfig, Finding, GraphConfig};

/// A finding correlated with the one under inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedFinding {
    pub finding: Finding,
    /// `None` when the upstream reported no score for the pair.
    pub score: Option<CorrelationScore>,
}

/// Detail flyout data for one finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificFindingCorrelations {
    pub finding: Finding,
    pub correlated: Vec<CorrelatedFinding>,
}

/// What a dispatched graph event did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum GraphEventOutcome {
    /// Double-click at AllFindings: the store moved to the Finding level.
    DrilledDown(Box<CorrelationGraphData>),
    /// Double-click at Finding: detail for the clicked node.
    FindingDetail(SpecificFindingCorrelations),
    /// Single click: the findings panel contents.
    FindingsSelected(Vec<Finding>),
    /// The event hit empty canvas.
    Ignored,
}

pub struct CorrelationStore<R: RuleRepository = InMemoryRuleRepository> {
    index: FindingCorrelationIndex,
    colors: ColorProvider,
    config: GraphConfig,
    levels: CorrelationLevelStateMachine,
    rules: R,
    window: TimeWindow,
    recent_windows: RecentWindows,
}

impl CorrelationStore<InMemoryRuleRepository> {
    pub fn new(index: FindingCorrelationIndex, config: GraphConfig) -> Self {
        Self::with_parts(index, ColorProvider::new(), config, InMemoryRuleRepository::new())
    }

    /// Store using the graph policy, palette and time window from `config`.
    /// A relative window is resolved against the current time.
    pub fn from_config(index: FindingCorrelationIndex, config: &CorrelationsConfig) -> CorrelationResult<Self> {
        let window = config.window.resolve(Utc::now())?;
        let mut store = Self::with_parts(
            index,
            ColorProvider::with_palette(config.palette.colors.clone()),
            config.graph.clone(),
            InMemoryRuleRepository::new(),
        );
        store.set_time_window(window);
        Ok(store)
    }
}

impl<R: RuleRepository> CorrelationStore<R> {
    pub fn with_parts(index: FindingCorrelationIndex, colors: ColorProvider, config: GraphConfig, rules: R) -> Self {
        log::info!(
            "Correlation store ready: {} findings, {} correlations",
            index.finding_count(),
            index.correlation_count()
        );
        Self {
            index,
            colors,
            config,
            levels: CorrelationLevelStateMachine::new(),
            rules,
            window: TimeWindow::unbounded(),
            recent_windows: RecentWindows::new(),
        }
    }

    pub fn index(&self) -> &FindingCorrelationIndex {
        &self.index
    }

    pub fn colors(&self) -> &ColorProvider {
        &self.colors
    }

    pub fn level(&self) -> &CorrelationLevel {
        self.levels.level()
    }

    pub fn current_graph(&self) -> Option<&CorrelationGraphData> {
        self.levels.current_graph()
    }

    pub fn can_go_back(&self) -> bool {
        self.levels.can_go_back()
    }

    pub fn history_len(&self) -> usize {
        self.levels.history_len()
    }

    /// Range the next refresh fetches.
    pub fn time_window(&self) -> &TimeWindow {
        &self.window
    }

    /// Ranges used so far, newest first.
    pub fn recent_windows(&self) -> &[TimeWindow] {
        self.recent_windows.as_slice()
    }

    /// Scope later refreshes to `window` and remember it among the recent
    /// ranges. Fetches already in flight for the old window become stale;
    /// the loaded index is kept until the next refresh.
    pub fn set_time_window(&mut self, window: TimeWindow) {
        log::info!("Time window set to {} .. {}", window.start(), window.end());
        self.window = window;
        self.recent_windows.record(window);
        self.levels.invalidate_fetches();
    }

    // -- Graph queries ------------------------------------------------------

    /// Graph for `level`, or for the current level when `None`.
    ///
    /// With an explicit level nothing about the store's level or history
    /// changes, so a deep link can preview a finding before navigating to
    /// it. Without one the graph is rebuilt and recorded as the one on
    /// screen. Either way the color provider may assign new colors.
    pub fn get_correlations_graph_data(
        &mut self,
        level: Option<&CorrelationLevel>,
    ) -> CorrelationResult<CorrelationGraphData> {
        match level {
            Some(level) => build_graph(&self.index, &mut self.colors, &self.config, level),
            None => {
                let graph = build_graph(&self.index, &mut self.colors, &self.config, self.levels.level())?;
                self.levels.show(graph.clone());
                Ok(graph)
            }
        }
    }

    /// Replace the AllFindings filters and rebuild. Not a transition: the
    /// history is untouched and handlers are not called.
    pub fn set_filters(
        &mut self,
        log_type_filter: Option<Vec<FilterItem>>,
        severity_filter: Option<Vec<FilterItem>>,
    ) -> CorrelationResult<CorrelationGraphData> {
        if self.levels.level().kind() != LevelKind::AllFindings {
            return Err(CorrelationError::WrongLevel(
                "filters apply to the AllFindings level; go back first".to_string(),
            ));
        }
        let level = CorrelationLevel::AllFindings {
            log_type_filter,
            severity_filter,
        };
        let graph = build_graph(&self.index, &mut self.colors, &self.config, &level)?;
        self.levels.show(graph.clone());
        Ok(graph)
    }

    // -- Navigation ---------------------------------------------------------

    pub fn register_graph_update_handler(&mut self, handler: GraphUpdateHandler) -> Subscription {
        self.levels.register_graph_update_handler(handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.levels.unsubscribe(subscription)
    }

    /// Back to unfiltered AllFindings with an empty history. Idempotent.
    pub fn reset_correlations_level(&mut self) {
        log::info!("Resetting correlations level");
        self.levels.reset();
    }

    /// Move to the Finding level for `finding_id`, pushing the graph on
    /// screen onto the history. Handlers have run by the time this returns.
    /// Only valid from AllFindings.
    pub fn drill_down(&mut self, finding_id: &str) -> CorrelationResult<CorrelationGraphData> {
        if self.levels.level().kind() == LevelKind::Finding {
            return Err(CorrelationError::WrongLevel(
                "already at a Finding level; go back before drilling into another finding".to_string(),
            ));
        }
        let next = build_graph(
            &self.index,
            &mut self.colors,
            &self.config,
            &CorrelationLevel::finding(finding_id),
        )?;
        if self.levels.current_graph().is_none() {
            let showing = build_graph(&self.index, &mut self.colors, &self.config, self.levels.level())?;
            self.levels.show(showing);
        }
        self.levels.transition(next.clone());
        Ok(next)
    }

    /// Restore the previous graph snapshot. `None` when there is nowhere to
    /// go back to.
    pub fn go_back(&mut self) -> Option<CorrelationGraphData> {
        self.levels.go_back().cloned()
    }

    /// Dispatch a renderer event through the bindings of the current level.
    pub fn handle_event(&mut self, event: &GraphEvent) -> CorrelationResult<GraphEventOutcome> {
        let Some(target) = event.target() else {
            return Ok(GraphEventOutcome::Ignored);
        };
        let bindings = EventBindings::for_level(self.levels.level().kind());
        match event {
            GraphEvent::DoubleClick { .. } => match bindings.double_click {
                DoubleClickAction::DrillDown => {
                    let graph = self.drill_down(target)?;
                    Ok(GraphEventOutcome::DrilledDown(Box::new(graph)))
                }
                DoubleClickAction::ShowFindingDetail => {
                    Ok(GraphEventOutcome::FindingDetail(self.get_correlated_findings(target)?))
                }
            },
            GraphEvent::Click { .. } => Ok(GraphEventOutcome::FindingsSelected(self.findings_list(target)?)),
        }
    }

    // -- Finding lookups ----------------------------------------------------

    pub fn get_finding(&self, id: &str) -> CorrelationResult<&Finding> {
        self.index.get_finding(id)
    }

    pub fn get_correlated_findings(&self, id: &str) -> CorrelationResult<SpecificFindingCorrelations> {
        let finding = self.index.get_finding(id)?.clone();
        let mut correlated = Vec::new();
        for other in self.index.get_correlated_finding_ids(id) {
            correlated.push(CorrelatedFinding {
                finding: self.index.get_finding(other)?.clone(),
                score: self.index.correlation_score(id, other),
            });
        }
        Ok(SpecificFindingCorrelations { finding, correlated })
    }

    /// The clicked finding, then its correlations oldest first. Findings
    /// without a timestamp go last.
    pub fn findings_list(&self, id: &str) -> CorrelationResult<Vec<Finding>> {
        let first = self.index.get_finding(id)?.clone();
        let mut rest = Vec::new();
        for other in self.index.get_correlated_finding_ids(id) {
            rest.push(self.index.get_finding(other)?.clone());
        }
        rest.sort_by_key(|f| (f.timestamp.is_none(), f.timestamp));
        let mut list = Vec::with_capacity(rest.len() + 1);
        list.push(first);
        list.extend(rest);
        Ok(list)
    }

    // -- Rules --------------------------------------------------------------

    /// Validate and store a rule.
    pub fn create_correlation_rule(&mut self, rule: CorrelationRule) -> CorrelationResult<()> {
        rule.validate()?;
        log::info!("Creating correlation rule '{}' over {:?}", rule.name, rule.log_types());
        self.rules.create(rule)
    }

    /// All rules in creation order.
    pub fn get_correlation_rules(&self) -> &[CorrelationRule] {
        self.rules.list()
    }

    /// Table rows for the rules page, optionally narrowed to rules touching
    /// any of `log_types`.
    pub fn correlation_rule_table(&self, log_types: Option<&[String]>) -> Vec<CorrelationRuleTableItem> {
        filter_rules_by_log_types(self.rules.list(), log_types)
            .into_iter()
            .map(CorrelationRuleTableItem::from)
            .collect()
    }

    // -- Upstream refresh ---------------------------------------------------

    /// Ticket for a fetch started now. Hand it back to [`Self::apply_fetch`].
    pub fn begin_fetch(&self) -> FetchTicket {
        self.levels.begin_fetch()
    }

    /// Pull both lists for `window` from `source` and build an index.
    pub async fn fetch_index(
        source: &dyn FindingsSource,
        window: &TimeWindow,
    ) -> CorrelationResult<FindingCorrelationIndex> {
        let doc = source.fetch(window).await?;
        FindingCorrelationIndex::from_parts(doc.findings, doc.correlations)
            .map_err(|e| CorrelationError::UpstreamFetch(format!("inconsistent upstream data: {}", e)))
    }

    /// Swap in a freshly fetched index and rebuild the current level.
    ///
    /// Rejected with `StaleFetch` if the store was reset or refreshed since
    /// `ticket` was issued. If the finding being viewed is gone from the new
    /// data the store falls back to AllFindings.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        index: FindingCorrelationIndex,
    ) -> CorrelationResult<CorrelationGraphData> {
        self.levels.accept_fetch(ticket)?;
        log::info!(
            "Applying refreshed data: {} findings, {} correlations",
            index.finding_count(),
            index.correlation_count()
        );
        self.index = index;
        match self.get_correlations_graph_data(None) {
            Err(CorrelationError::NotFound(id)) => {
                log::warn!("Finding {} disappeared after refresh, returning to AllFindings", id);
                self.levels.reset();
                self.get_correlations_graph_data(None)
            }
            other => other,
        }
    }

    /// Fetch the current window from `source` and apply the result. On
    /// failure the previous index and graph stay in place and the error is
    /// returned.
    pub async fn refresh(&mut self, source: &dyn FindingsSource) -> CorrelationResult<CorrelationGraphData> {
        let ticket = self.begin_fetch();
        let window = self.window;
        match Self::fetch_index(source, &window).await {
            Ok(index) => self.apply_fetch(ticket, index),
            Err(e) => {
                log::warn!("Refresh failed, keeping last known graph: {}", e);
                Err(e)
            }
        }
    }
}

impl<R: RuleRepository> std::fmt::Debug for CorrelationStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationStore")
            .field("findings", &self.index.finding_count())
            .field("correlations", &self.index.correlation_count())
            .field("levels", &self.levels)
            .field("window", &self.window)
            .field("rules", &self.rules.list().len())
            .finish()
    }
}
