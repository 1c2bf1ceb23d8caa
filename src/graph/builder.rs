// Finding Correlations - Correlation Graph
// builder.rs - Projection from the correlation index to renderer input
//
// These functions read the index and never touch level state. The only
// side effect is on the color provider, which assigns a color the first
// time it sees a log type.
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

use std::collections::HashSet;

use crate::colors::ColorProvider;
use crate::filters::{admits_finding, FilterItem};
use crate::graph::edges::{EdgeSet, GraphEdge};
use crate::graph::nodes::{GraphNode, NodeScaling};
use crate::graph::scaling::custom_scaling_function;
use crate::graph::{CorrelationGraph, CorrelationGraphData, CorrelationLevel, EventBindings, LevelKind};
use crate::index::{canonical_pair, FindingCorrelationIndex};
use crate::{CorrelationResult, GraphConfig};

/// Build the graph for any level.
pub fn build_graph(
    index: &FindingCorrelationIndex,
    colors: &mut ColorProvider,
    config: &GraphConfig,
    level: &CorrelationLevel,
) -> CorrelationResult<CorrelationGraphData> {
    match level {
        CorrelationLevel::AllFindings {
            log_type_filter,
            severity_filter,
        } => Ok(build_all_findings_graph(
            index,
            colors,
            config,
            log_type_filter.as_deref(),
            severity_filter.as_deref(),
        )),
        CorrelationLevel::Finding { finding_id } => build_finding_graph(index, colors, config, finding_id),
    }
}

/// AllFindings level: one node per correlated finding that passes the
/// filters, one edge per correlated pair with both ends visible.
///
/// Findings without correlations are not drawn. `value` is the full degree
/// from the index, so hiding a log type does not shrink its neighbours.
pub fn build_all_findings_graph(
    index: &FindingCorrelationIndex,
    colors: &mut ColorProvider,
    config: &GraphConfig,
    log_type_filter: Option<&[FilterItem]>,
    severity_filter: Option<&[FilterItem]>,
) -> CorrelationGraphData {
    let scaling = NodeScaling::for_level(config, LevelKind::AllFindings);

    let visible: Vec<_> = index
        .correlated_findings()
        .filter(|f| admits_finding(f, log_type_filter, severity_filter))
        .collect();
    let visible_ids: HashSet<&str> = visible.iter().map(|f| f.id.as_str()).collect();

    let mut nodes = Vec::with_capacity(visible.len());
    let mut edges = Vec::new();
    let mut emitted = EdgeSet::new();

    for finding in &visible {
        let color = colors.get_color(&finding.log_type);
        nodes.push(GraphNode::from_finding(finding, index.degree(&finding.id), color, scaling));

        for neighbor in index.get_correlated_finding_ids(&finding.id) {
            if !visible_ids.contains(neighbor.as_str()) {
                continue;
            }
            if !emitted.insert(&finding.id, neighbor) {
                continue;
            }
            let (from, to) = canonical_pair(&finding.id, neighbor);
            let mut edge = GraphEdge::new(from, to);
            edge.score = index.correlation_score(from, to);
            edges.push(edge);
        }
    }

    apply_degree_scaling(&mut nodes);

    log::debug!(
        "Built AllFindings graph: {} nodes, {} edges",
        nodes.len(),
        edges.len()
    );

    CorrelationGraphData {
        level: LevelKind::AllFindings,
        level_info: CorrelationLevel::AllFindings {
            log_type_filter: log_type_filter.map(<[FilterItem]>::to_vec),
            severity_filter: severity_filter.map(<[FilterItem]>::to_vec),
        },
        graph: CorrelationGraph { nodes, edges },
        events: EventBindings::for_level(LevelKind::AllFindings),
    }
}

/// Finding level: the focused finding plus its direct correlations, one
/// scored edge to each. No second hop.
pub fn build_finding_graph(
    index: &FindingCorrelationIndex,
    colors: &mut ColorProvider,
    config: &GraphConfig,
    finding_id: &str,
) -> CorrelationResult<CorrelationGraphData> {
    let scaling = NodeScaling::for_level(config, LevelKind::Finding);
    let focus = index.get_finding(finding_id)?;
    let neighbors = index.get_correlated_finding_ids(finding_id);

    let mut nodes = Vec::with_capacity(neighbors.len() + 1);
    let mut edges = Vec::with_capacity(neighbors.len());

    let color = colors.get_color(&focus.log_type);
    let mut focus_node = GraphNode::from_finding(focus, neighbors.len(), color, scaling);
    focus_node.chosen = true;
    nodes.push(focus_node);

    for neighbor_id in neighbors {
        let neighbor = index.get_finding(neighbor_id)?;
        let color = colors.get_color(&neighbor.log_type);
        nodes.push(GraphNode::from_finding(neighbor, index.degree(neighbor_id), color, scaling));

        let score = index.correlation_score(finding_id, neighbor_id);
        edges.push(GraphEdge::new(finding_id, neighbor_id).with_score_label(score));
    }

    apply_degree_scaling(&mut nodes);

    log::debug!(
        "Built Finding graph for {}: {} correlated findings",
        finding_id,
        neighbors.len()
    );

    Ok(CorrelationGraphData {
        level: LevelKind::Finding,
        level_info: CorrelationLevel::finding(finding_id),
        graph: CorrelationGraph { nodes, edges },
        events: EventBindings::for_level(LevelKind::Finding),
    })
}

fn apply_degree_scaling(nodes: &mut [GraphNode]) {
    let min = nodes.iter().map(|n| n.value).min().unwrap_or(0) as f64;
    let max = nodes.iter().map(|n| n.value).max().unwrap_or(0) as f64;
    let total = nodes.iter().map(|n| n.value).sum::<usize>() as f64;
    for node in nodes.iter_mut() {
        node.scaled_value = custom_scaling_function(min, max, total, node.value as f64);
    }
}
