// Finding Correlations - Correlation Graph
// nodes.rs - Finding nodes with color and size metadata
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

use serde::{Deserialize, Serialize};

use crate::filters::abbreviation_for_log_type;
use crate::graph::LevelKind;
use crate::{Finding, GraphConfig};

/// Label sizing policy handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelScaling {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
    pub max_visible: f64,
    /// Labels rendered smaller than this many pixels are not drawn.
    pub draw_threshold: f64,
}

/// Node sizing policy handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeScaling {
    pub min: f64,
    pub max: f64,
    pub label: LabelScaling,
}

impl NodeScaling {
    /// Policy for a level. Only the label draw threshold differs between
    /// levels: high on the dense AllFindings view, near zero on Finding.
    pub fn for_level(config: &GraphConfig, kind: LevelKind) -> Self {
        let draw_threshold = match kind {
            LevelKind::AllFindings => config.all_findings_draw_threshold,
            LevelKind::Finding => config.finding_draw_threshold,
        };
        Self {
            min: config.node_min_size,
            max: config.node_max_size,
            label: LabelScaling {
                enabled: true,
                min: config.label_min,
                max: config.label_max,
                max_visible: config.label_max_visible,
                draw_threshold,
            },
        }
    }
}

/// One finding as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,

    /// Log type abbreviation drawn in the node.
    pub label: String,

    /// Tooltip lines.
    pub title: Vec<String>,

    pub log_type: String,

    /// Number of correlated findings (the node's degree).
    pub value: usize,

    /// `value` normalised against the graph's degree range.
    pub scaled_value: f64,

    pub color: String,
    pub scaling: NodeScaling,

    /// Marks the focused finding at the Finding level.
    pub chosen: bool,
}

impl GraphNode {
    pub fn from_finding(finding: &Finding, degree: usize, color: String, scaling: NodeScaling) -> Self {
        Self {
            id: finding.id.clone(),
            label: abbreviation_for_log_type(&finding.log_type),
            title: tooltip_lines(finding),
            log_type: finding.log_type.clone(),
            value: degree,
            scaled_value: 0.0,
            color,
            scaling,
            chosen: false,
        }
    }
}

fn tooltip_lines(finding: &Finding) -> Vec<String> {
    let mut lines = vec![
        finding.display_name().to_string(),
        format!("Log type: {}", finding.log_type),
    ];
    if let Some(ts) = finding.timestamp {
        lines.push(ts.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    }
    if let Some(rule) = &finding.rule {
        lines.push(format!("Rule: {}", rule.name));
        lines.push(format!("Severity: {}", rule.severity));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DetectionRule, Severity};
    use chrono::DateTime;

    #[test]
    fn test_draw_threshold_differs_by_level() {
        let config = GraphConfig::default();
        let all = NodeScaling::for_level(&config, LevelKind::AllFindings);
        let one = NodeScaling::for_level(&config, LevelKind::Finding);
        assert!(all.label.draw_threshold > one.label.draw_threshold);
        assert_eq!(all.min, one.min);
    }

    #[test]
    fn test_tooltip_includes_rule() {
        let finding = Finding::new("dns-1", "dns")
            .with_timestamp(DateTime::from_timestamp(0, 0).unwrap())
            .with_rule(DetectionRule {
                id: "r1".into(),
                name: "TXT exfil".into(),
                severity: Severity::High,
            });
        let node = GraphNode::from_finding(
            &finding,
            2,
            "#54B399".into(),
            NodeScaling::for_level(&GraphConfig::default(), LevelKind::AllFindings),
        );
        assert_eq!(node.label, "DNS");
        assert_eq!(node.value, 2);
        assert!(node.title.contains(&"Rule: TXT exfil".to_string()));
        assert!(node.title.contains(&"Severity: high".to_string()));
        assert!(node.title.contains(&"1970-01-01 00:00:00 UTC".to_string()));
    }
}
