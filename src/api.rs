//! # Correlation API Handlers
//!
//! Request/response types and handler functions over [`CorrelationStore`].
//! These are transport-agnostic: the CLI calls them today, an HTTP or
//! message layer can call them the same way.
//!
//! ## Commands (when wired to HTTP):
//! - `graph`        -> graph data (body: `{"level": CorrelationLevel?}`)
//! - `drill_down`   -> Finding-level graph (body: `{"finding_id": ..}`)
//! - `go_back`      -> restored graph, or `null` with empty history
//! - `reset`        -> AllFindings graph after reset
//! - `set_filters`  -> filtered AllFindings graph
//! - `event`        -> outcome of a renderer event (body: `GraphEvent`)
//! - `correlated`   -> detail flyout for one finding
//! - `create_rule`  -> the stored rule (body: `CorrelationRule`)
//! - `list_rules`   -> rule table rows (body: `{"log_types": [..]?}`)
//! - `set_time_window` -> active and recent windows (body: `{"start": .., "end": ..}`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filters::FilterItem;
use crate::graph::{CorrelationLevel, GraphEvent};
use crate::rules::{CorrelationRule, RuleRepository};
use crate::store::CorrelationStore;
use crate::window::TimeWindow;
use crate::{CorrelationError, CorrelationResult};

/// Response envelope for every command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the operation succeeded.
    pub ok: bool,

    /// Human-readable message about what happened.
    pub message: String,

    /// Command payload. `null` on failure.
    pub data: serde_json::Value,
}

impl ApiResponse {
    fn success<T: Serialize>(message: impl Into<String>, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                ok: true,
                message: message.into(),
                data,
            },
            Err(e) => Self::failure(&CorrelationError::Json(e)),
        }
    }

    fn failure(err: &CorrelationError) -> Self {
        Self {
            ok: false,
            message: err.to_string(),
            data: serde_json::Value::Null,
        }
    }

    fn from_result<T: Serialize>(message: impl Into<String>, result: CorrelationResult<T>) -> Self {
        match result {
            Ok(data) => Self::success(message, &data),
            Err(e) => Self::failure(&e),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphRequest {
    #[serde(default)]
    pub level: Option<CorrelationLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingRequest {
    pub finding_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiltersRequest {
    #[serde(default)]
    pub log_type_filter: Option<Vec<FilterItem>>,
    #[serde(default)]
    pub severity_filter: Option<Vec<FilterItem>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesQuery {
    #[serde(default)]
    pub log_types: Option<Vec<String>>,
}

/// RFC 3339 bounds. Equal bounds mean "from `start` until now".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindowRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeWindowResponse {
    pub window: TimeWindow,
    pub recent: Vec<TimeWindow>,
}

/// Graph data for a level, or the current one.
pub fn handle_graph<R: RuleRepository>(store: &mut CorrelationStore<R>, req: GraphRequest) -> ApiResponse {
    let result = store.get_correlations_graph_data(req.level.as_ref());
    let message = match &result {
        Ok(g) => format!(
            "{:?} graph: {} nodes, {} edges",
            g.level,
            g.graph.nodes.len(),
            g.graph.edges.len()
        ),
        Err(_) => String::new(),
    };
    ApiResponse::from_result(message, result)
}

pub fn handle_drill_down<R: RuleRepository>(store: &mut CorrelationStore<R>, req: FindingRequest) -> ApiResponse {
    let result = store.drill_down(&req.finding_id);
    ApiResponse::from_result(format!("Drilled into finding {}", req.finding_id), result)
}

pub fn handle_go_back<R: RuleRepository>(store: &mut CorrelationStore<R>) -> ApiResponse {
    match store.go_back() {
        Some(graph) => ApiResponse::success(format!("Back to {:?}", graph.level), &graph),
        None => ApiResponse {
            ok: true,
            message: "Nothing to go back to".to_string(),
            data: serde_json::Value::Null,
        },
    }
}

/// Reset and return the fresh AllFindings graph.
pub fn handle_reset<R: RuleRepository>(store: &mut CorrelationStore<R>) -> ApiResponse {
    store.reset_correlations_level();
    let result = store.get_correlations_graph_data(None);
    ApiResponse::from_result("Correlations level reset", result)
}

pub fn handle_set_filters<R: RuleRepository>(store: &mut CorrelationStore<R>, req: FiltersRequest) -> ApiResponse {
    let result = store.set_filters(req.log_type_filter, req.severity_filter);
    ApiResponse::from_result("Filters applied", result)
}

pub fn handle_event<R: RuleRepository>(store: &mut CorrelationStore<R>, event: GraphEvent) -> ApiResponse {
    let result = store.handle_event(&event);
    ApiResponse::from_result("Event handled", result)
}

pub fn handle_correlated_findings<R: RuleRepository>(store: &CorrelationStore<R>, req: FindingRequest) -> ApiResponse {
    let result = store.get_correlated_findings(&req.finding_id);
    let message = match &result {
        Ok(detail) => format!("{} correlated findings", detail.correlated.len()),
        Err(_) => String::new(),
    };
    ApiResponse::from_result(message, result)
}

pub fn handle_create_rule<R: RuleRepository>(store: &mut CorrelationStore<R>, rule: CorrelationRule) -> ApiResponse {
    let name = rule.name.clone();
    match store.create_correlation_rule(rule.clone()) {
        Ok(()) => ApiResponse::success(format!("Created rule '{}'", name), &rule),
        Err(e) => ApiResponse::failure(&e),
    }
}

pub fn handle_list_rules<R: RuleRepository>(store: &CorrelationStore<R>, query: RulesQuery) -> ApiResponse {
    let items = store.correlation_rule_table(query.log_types.as_deref());
    ApiResponse::success(format!("{} rules", items.len()), &items)
}

/// Scope the next refresh. The graph on screen is not rebuilt.
pub fn handle_set_time_window<R: RuleRepository>(
    store: &mut CorrelationStore<R>,
    req: TimeWindowRequest,
) -> ApiResponse {
    match TimeWindow::from_bounds(req.start, req.end, Utc::now()) {
        Ok(window) => {
            store.set_time_window(window);
            let resp = TimeWindowResponse {
                window,
                recent: store.recent_windows().to_vec(),
            };
            ApiResponse::success(format!("Time window {} .. {}", window.start(), window.end()), &resp)
        }
        Err(e) => ApiResponse::failure(&e),
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: serde_json::Value) -> Result<T, ApiResponse> {
    serde_json::from_value(args).map_err(|e| ApiResponse::failure(&CorrelationError::Json(e)))
}

/// Route a command by name.
///
/// Single entry point for CLI or HTTP dispatch. `args` is the command's
/// JSON body; `null` is accepted where every field is optional.
pub fn route_command<R: RuleRepository>(
    store: &mut CorrelationStore<R>,
    command: &str,
    args: serde_json::Value,
) -> ApiResponse {
    let args = if args.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        args
    };
    let routed: Result<ApiResponse, ApiResponse> = match command {
        "graph" => parse_args(args).map(|req| handle_graph(store, req)),
        "drill_down" => parse_args(args).map(|req| handle_drill_down(store, req)),
        "go_back" => Ok(handle_go_back(store)),
        "reset" => Ok(handle_reset(store)),
        "set_filters" => parse_args(args).map(|req| handle_set_filters(store, req)),
        "event" => parse_args(args).map(|ev| handle_event(store, ev)),
        "correlated" => parse_args(args).map(|req| handle_correlated_findings(store, req)),
        "create_rule" => parse_args(args).map(|rule| handle_create_rule(store, rule)),
        "list_rules" => parse_args(args).map(|q| handle_list_rules(store, q)),
        "set_time_window" => parse_args(args).map(|req| handle_set_time_window(store, req)),
        unknown => Err(ApiResponse {
            ok: false,
            message: format!(
                "Unknown command: '{}'. Valid: graph, drill_down, go_back, reset, set_filters, event, correlated, create_rule, list_rules, set_time_window",
                unknown
            ),
            data: serde_json::Value::Null,
        }),
    };
    routed.unwrap_or_else(|resp| resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FindingCorrelationIndex;
    use crate::{CorrelationPair, Finding, GraphConfig};
    use serde_json::json;

    fn store() -> CorrelationStore {
        let index = FindingCorrelationIndex::from_parts(
            vec![Finding::new("F1", "dns"), Finding::new("F2", "s3"), Finding::new("F3", "s3")],
            vec![CorrelationPair::new("F1", "F2"), CorrelationPair::new("F1", "F3")],
        )
        .unwrap();
        CorrelationStore::new(index, GraphConfig::default())
    }

    #[test]
    fn test_route_graph() {
        let mut s = store();
        let resp = route_command(&mut s, "graph", serde_json::Value::Null);
        assert!(resp.ok);
        assert_eq!(resp.data["graph"]["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(resp.data["level"], "AllFindings");
    }

    #[test]
    fn test_route_drill_and_back() {
        let mut s = store();
        let resp = route_command(&mut s, "drill_down", json!({"finding_id": "F1"}));
        assert!(resp.ok);
        assert_eq!(resp.data["level_info"]["finding_id"], "F1");

        let resp = route_command(&mut s, "go_back", json!(null));
        assert!(resp.ok);
        assert_eq!(resp.data["level"], "AllFindings");

        let resp = route_command(&mut s, "go_back", json!(null));
        assert!(resp.ok);
        assert!(resp.data.is_null());
    }

    #[test]
    fn test_route_drill_down_rejected_at_finding_level() {
        let mut s = store();
        assert!(route_command(&mut s, "drill_down", json!({"finding_id": "F1"})).ok);

        let resp = route_command(&mut s, "drill_down", json!({"finding_id": "F2"}));
        assert!(!resp.ok);
        assert!(resp.message.contains("current level"));
        assert!(resp.data.is_null());
        assert_eq!(s.level(), &CorrelationLevel::finding("F1"));
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn test_route_set_time_window() {
        let mut s = store();
        let body = json!({"start": "2026-01-01T00:00:00Z", "end": "2026-01-02T00:00:00Z"});
        let resp = route_command(&mut s, "set_time_window", body);
        assert!(resp.ok);
        assert_eq!(resp.data["recent"].as_array().unwrap().len(), 1);
        assert_eq!(s.time_window().end().to_rfc3339(), "2026-01-02T00:00:00+00:00");

        // Equal bounds reach up to now.
        let body = json!({"start": "2026-01-01T00:00:00Z", "end": "2026-01-01T00:00:00Z"});
        let resp = route_command(&mut s, "set_time_window", body);
        assert!(resp.ok);
        assert!(s.time_window().end() > s.time_window().start());
        assert_eq!(resp.data["recent"].as_array().unwrap().len(), 2);

        let inverted = json!({"start": "2026-01-02T00:00:00Z", "end": "2026-01-01T00:00:00Z"});
        let resp = route_command(&mut s, "set_time_window", inverted);
        assert!(!resp.ok);
        assert!(resp.message.contains("Invalid time window"));
        assert_eq!(s.recent_windows().len(), 2);
    }

    #[test]
    fn test_route_event() {
        let mut s = store();
        let resp = route_command(&mut s, "event", json!({"event": "click", "nodes": ["F2"]}));
        assert!(resp.ok);
        assert_eq!(resp.data["outcome"], "findings_selected");
        assert_eq!(resp.data["data"][0]["id"], "F2");
    }

    #[test]
    fn test_route_unknown_finding() {
        let mut s = store();
        let resp = route_command(&mut s, "correlated", json!({"finding_id": "ghost"}));
        assert!(!resp.ok);
        assert!(resp.message.contains("ghost"));
    }

    #[test]
    fn test_route_rules() {
        let mut s = store();
        let rule = json!({
            "name": "dns to s3",
            "fields": [
                {"log_type": "dns", "conditions": [{"name": "dns.question.name", "value": "x", "condition": "AND"}]},
                {"log_type": "s3", "conditions": []}
            ]
        });
        assert!(route_command(&mut s, "create_rule", rule).ok);
        let resp = route_command(&mut s, "list_rules", json!({"log_types": ["s3"]}));
        assert!(resp.ok);
        assert_eq!(resp.data[0]["log_types"], "dns,s3");

        let bad = json!({"name": "half", "fields": [{"log_type": "dns"}]});
        let resp = route_command(&mut s, "create_rule", bad);
        assert!(!resp.ok);
        assert!(resp.message.contains("at least two"));
    }

    #[test]
    fn test_route_bad_args() {
        let mut s = store();
        let resp = route_command(&mut s, "drill_down", json!({"id": "F1"}));
        assert!(!resp.ok);
    }

    #[test]
    fn test_route_unknown_command() {
        let mut s = store();
        let resp = route_command(&mut s, "explode", json!(null));
        assert!(!resp.ok);
        assert!(resp.message.contains("Unknown"));
    }
}
