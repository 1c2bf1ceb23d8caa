// Finding Correlations - Correlation Graph
// edges.rs - Undirected correlation edges and their dedup set
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::index::canonical_pair;
use crate::CorrelationScore;

/// Label shown on Finding-level edges whose pair carries no score.
pub const MISSING_SCORE_LABEL: &str = "n/a";

/// An undirected edge between two findings. `from` is always the
/// lexicographically smaller id at the AllFindings level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// `"{from}:{to}"`.
    pub id: String,
    pub from: String,
    pub to: String,

    /// Correlation strength. `None` when the backend reported no score.
    pub score: Option<CorrelationScore>,

    /// Edge caption. Only set at the Finding level.
    pub label: Option<String>,
}

impl GraphEdge {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            id: format!("{}:{}", from, to),
            from: from.to_string(),
            to: to.to_string(),
            score: None,
            label: None,
        }
    }

    /// Attach a score and caption it, or caption it as missing.
    pub fn with_score_label(mut self, score: Option<CorrelationScore>) -> Self {
        self.label = Some(match score {
            Some(s) => format!("{:.2}", s.value),
            None => MISSING_SCORE_LABEL.to_string(),
        });
        self.score = score;
        self
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// Undirected pairs already emitted while building one graph.
///
/// Both the membership check and the insert use the same canonical
/// (smaller, larger) key, so iteration order over the adjacency list
/// cannot produce a duplicate.
#[derive(Debug, Default)]
pub struct EdgeSet {
    seen: HashSet<(String, String)>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pair. Returns `false` if it was already present.
    pub fn insert(&mut self, a: &str, b: &str) -> bool {
        let (lo, hi) = canonical_pair(a, b);
        self.seen.insert((lo.to_string(), hi.to_string()))
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        let (lo, hi) = canonical_pair(a, b);
        self.seen.contains(&(lo.to_string(), hi.to_string()))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
