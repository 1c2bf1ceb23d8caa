// Finding Correlations - Correlation Graph
// mod.rs - Level info, renderer-facing graph types and module exports
//
// The graph is an output artifact: rebuilt on every query and replaced,
// never patched in place.
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

pub mod builder;
pub mod edges;
pub mod nodes;
pub mod scaling;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filters::FilterItem;

pub use builder::{build_all_findings_graph, build_finding_graph, build_graph};
pub use edges::{EdgeSet, GraphEdge};
pub use nodes::{GraphNode, LabelScaling, NodeScaling};
pub use scaling::custom_scaling_function;

/// Which drill-down level a graph was built for, with its parameters.
///
/// `finding_id` only exists on the `Finding` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level")]
pub enum CorrelationLevel {
    /// One node per correlated finding.
    AllFindings {
        #[serde(default)]
        log_type_filter: Option<Vec<FilterItem>>,
        #[serde(default)]
        severity_filter: Option<Vec<FilterItem>>,
    },
    /// One finding and its direct correlations.
    Finding { finding_id: String },
}

impl CorrelationLevel {
    /// AllFindings with no filters. The initial level.
    pub fn all_findings() -> Self {
        CorrelationLevel::AllFindings {
            log_type_filter: None,
            severity_filter: None,
        }
    }

    pub fn finding(finding_id: impl Into<String>) -> Self {
        CorrelationLevel::Finding {
            finding_id: finding_id.into(),
        }
    }

    pub fn kind(&self) -> LevelKind {
        match self {
            CorrelationLevel::AllFindings { .. } => LevelKind::AllFindings,
            CorrelationLevel::Finding { .. } => LevelKind::Finding,
        }
    }
}

impl Default for CorrelationLevel {
    fn default() -> Self {
        Self::all_findings()
    }
}

/// Bare level tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelKind {
    AllFindings,
    Finding,
}

/// Nodes and edges as the renderer consumes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl CorrelationGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        let mut per_log_type = BTreeMap::new();
        for node in &self.nodes {
            *per_log_type.entry(node.log_type.clone()).or_insert(0) += 1;
        }
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            min_degree: self.nodes.iter().map(|n| n.value).min().unwrap_or(0),
            max_degree: self.nodes.iter().map(|n| n.value).max().unwrap_or(0),
            nodes_per_log_type: per_log_type,
        }
    }
}

/// What a double-click does at a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleClickAction {
    /// Move to the Finding level for the clicked node.
    DrillDown,
    /// Show the clicked finding's details. No level change.
    ShowFindingDetail,
}

/// What a single click does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    /// Fill the findings panel with the clicked finding and its correlations.
    SelectFindings,
}

/// Event handlers bound to a graph, described as data. The store dispatches
/// them in `CorrelationStore::handle_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBindings {
    pub double_click: DoubleClickAction,
    pub click: ClickAction,
}

impl EventBindings {
    pub fn for_level(kind: LevelKind) -> Self {
        let double_click = match kind {
            LevelKind::AllFindings => DoubleClickAction::DrillDown,
            LevelKind::Finding => DoubleClickAction::ShowFindingDetail,
        };
        Self {
            double_click,
            click: ClickAction::SelectFindings,
        }
    }
}

/// Interaction raised by the renderer. `nodes` holds the ids under the
/// pointer; it is empty when the user clicks the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GraphEvent {
    Click { nodes: Vec<String> },
    DoubleClick { nodes: Vec<String> },
}

impl GraphEvent {
    pub fn double_click(node: impl Into<String>) -> Self {
        GraphEvent::DoubleClick {
            nodes: vec![node.into()],
        }
    }

    pub fn click(node: impl Into<String>) -> Self {
        GraphEvent::Click {
            nodes: vec![node.into()],
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            GraphEvent::Click { nodes } | GraphEvent::DoubleClick { nodes } => {
                nodes.first().map(String::as_str)
            }
        }
    }
}

/// Renderer input for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationGraphData {
    pub level: LevelKind,
    /// The full level the graph was built for, filters included.
    pub level_info: CorrelationLevel,
    pub graph: CorrelationGraph,
    pub events: EventBindings,
}

impl CorrelationGraphData {
    /// Empty graph for a level. Shown before the first successful load.
    pub fn empty(level_info: CorrelationLevel) -> Self {
        let kind = level_info.kind();
        Self {
            level: kind,
            level_info,
            graph: CorrelationGraph::default(),
            events: EventBindings::for_level(kind),
        }
    }
}

/// Summary statistics about a built graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub nodes_per_log_type: BTreeMap<String, usize>,
}
