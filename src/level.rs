//! # Correlation Level State Machine
//!
//! Tracks the drill-down level, the graph currently on screen, and a LIFO
//! history of prior graphs for "go back".
//!
//! ```text
//!   AllFindings --double-click(id)--> Finding(id)
//!        ^                                |
//!        +------------ go back -----------+
//!   reset: any state -> AllFindings, history cleared
//! ```
//!
//! Going back restores the stored snapshot as-is. Filters changed after the
//! snapshot was taken are not re-applied, so the restored view can be stale.
//!
//! Update handlers run synchronously, in registration order, before the
//! transition call returns.

use crate::graph::{CorrelationGraphData, CorrelationLevel};
use crate::{CorrelationError, CorrelationResult};

/// Callback invoked with the new graph after every transition.
pub type GraphUpdateHandler = Box<dyn FnMut(&CorrelationGraphData)>;

/// Handle returned by handler registration; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Generation a data fetch was started under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

pub struct CorrelationLevelStateMachine {
    level: CorrelationLevel,
    current: Option<CorrelationGraphData>,
    history: Vec<CorrelationGraphData>,
    handlers: Vec<(Subscription, GraphUpdateHandler)>,
    next_subscription: u64,
    /// Bumped by reset and by every accepted fetch.
    generation: u64,
}

impl CorrelationLevelStateMachine {
    pub fn new() -> Self {
        Self {
            level: CorrelationLevel::all_findings(),
            current: None,
            history: Vec::new(),
            handlers: Vec::new(),
            next_subscription: 0,
            generation: 0,
        }
    }

    pub fn level(&self) -> &CorrelationLevel {
        &self.level
    }

    /// The graph last put on screen, if any.
    pub fn current_graph(&self) -> Option<&CorrelationGraphData> {
        self.current.as_ref()
    }

    /// Record the graph shown for the current level without a transition.
    /// Used for the initial render and for filter changes at AllFindings.
    pub fn show(&mut self, graph: CorrelationGraphData) {
        self.level = graph.level_info.clone();
        self.current = Some(graph);
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn register_graph_update_handler(&mut self, handler: GraphUpdateHandler) -> Subscription {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.handlers.push((subscription, handler));
        subscription
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(s, _)| *s != subscription);
        self.handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Move forward to `graph`'s level, pushing the current graph onto the
    /// history, then notify every handler.
    pub fn transition(&mut self, graph: CorrelationGraphData) {
        if let Some(previous) = self.current.take() {
            self.history.push(previous);
        }
        log::info!(
            "Correlation level {:?} -> {:?} (history depth {})",
            self.level.kind(),
            graph.level,
            self.history.len()
        );
        self.level = graph.level_info.clone();
        self.current = Some(graph);
        self.notify();
    }

    /// Restore the most recent history entry. `None` (and no change) when
    /// the history is empty.
    pub fn go_back(&mut self) -> Option<&CorrelationGraphData> {
        let previous = self.history.pop()?;
        log::info!(
            "Going back to {:?} (history depth {})",
            previous.level,
            self.history.len()
        );
        self.level = previous.level_info.clone();
        self.current = Some(previous);
        self.notify();
        self.current.as_ref()
    }

    /// Back to AllFindings with no filters and an empty history. Any fetch
    /// started before the reset becomes stale.
    pub fn reset(&mut self) {
        self.level = CorrelationLevel::all_findings();
        self.current = None;
        self.history.clear();
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Make every outstanding fetch stale without touching the level.
    pub fn invalidate_fetches(&mut self) {
        self.generation += 1;
    }

    /// Start a fetch under the current generation.
    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket(self.generation)
    }

    /// Accept a fetch result if nothing newer happened since `ticket` was
    /// issued. Accepting bumps the generation.
    pub fn accept_fetch(&mut self, ticket: FetchTicket) -> CorrelationResult<()> {
        if ticket.0 != self.generation {
            log::warn!(
                "Discarding stale fetch (ticket {}, current generation {})",
                ticket.0,
                self.generation
            );
            return Err(CorrelationError::StaleFetch {
                ticket: ticket.0,
                current: self.generation,
            });
        }
        self.generation += 1;
        Ok(())
    }

    fn notify(&mut self) {
        if let Some(graph) = self.current.as_ref() {
            for (_, handler) in self.handlers.iter_mut() {
                handler(graph);
            }
        }
    }
}

impl Default for CorrelationLevelStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CorrelationLevelStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationLevelStateMachine")
            .field("level", &self.level)
            .field("history_len", &self.history.len())
            .field("handlers", &self.handlers.len())
            .field("generation", &self.generation)
            .finish()
    }
}
