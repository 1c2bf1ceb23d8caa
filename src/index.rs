//! # Finding Correlation Index
//!
//! In-memory findings and the symmetric adjacency list between them.
//!
//! Every correlation is stored on both endpoints. The only mutator,
//! [`FindingCorrelationIndex::add_correlation`], writes both sides inside one
//! `&mut self` call, so there is no window where the relation is one-sided.
//! Iteration order is insertion order for findings and adjacency keys, which
//! keeps built graphs deterministic.

use std::collections::{HashMap, HashSet};

use crate::{CorrelationError, CorrelationPair, CorrelationResult, CorrelationScore, Finding};

/// Order an undirected pair so the smaller id comes first.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindingCorrelationIndex {
    findings: HashMap<String, Finding>,
    finding_order: Vec<String>,
    adjacency: HashMap<String, Vec<String>>,
    /// Adjacency keys in the order they first gained a correlation.
    adjacency_order: Vec<String>,
    scores: HashMap<(String, String), CorrelationScore>,
    pair_count: usize,
}

impl FindingCorrelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from upstream data. Pair scores are treated as backend
    /// scores; pairs without one keep no score.
    pub fn from_parts(findings: Vec<Finding>, pairs: Vec<CorrelationPair>) -> CorrelationResult<Self> {
        let mut index = Self::new();
        for finding in findings {
            index.insert_finding(finding)?;
        }
        for pair in pairs {
            let score = pair.score.map(CorrelationScore::backend);
            index.add_correlation(&pair.a, &pair.b, score)?;
        }
        Ok(index)
    }

    /// Add a finding. Ids are unique across the index.
    pub fn insert_finding(&mut self, finding: Finding) -> CorrelationResult<()> {
        if self.findings.contains_key(&finding.id) {
            return Err(CorrelationError::DuplicateFinding(finding.id));
        }
        self.finding_order.push(finding.id.clone());
        self.findings.insert(finding.id.clone(), finding);
        Ok(())
    }

    /// Correlate two findings, updating both adjacency lists.
    ///
    /// Returns `Ok(false)` when the pair already exists (the first score wins).
    /// Same-log-type pairs are accepted here; only the fixture generator
    /// refuses to create them.
    pub fn add_correlation(
        &mut self,
        a: &str,
        b: &str,
        score: Option<CorrelationScore>,
    ) -> CorrelationResult<bool> {
        if a == b {
            return Err(CorrelationError::InvalidCorrelation(format!(
                "finding '{}' cannot correlate with itself",
                a
            )));
        }
        for id in [a, b] {
            if !self.findings.contains_key(id) {
                return Err(CorrelationError::InvalidCorrelation(format!(
                    "correlation references unknown finding '{}'",
                    id
                )));
            }
        }
        if self.are_correlated(a, b) {
            return Ok(false);
        }

        self.push_neighbor(a, b);
        self.push_neighbor(b, a);
        if let Some(score) = score {
            let (lo, hi) = canonical_pair(a, b);
            self.scores.insert((lo.to_string(), hi.to_string()), score);
        }
        self.pair_count += 1;
        Ok(true)
    }

    fn push_neighbor(&mut self, from: &str, to: &str) {
        if !self.adjacency.contains_key(from) {
            self.adjacency_order.push(from.to_string());
        }
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
    }

    /// Look up a finding by id.
    pub fn get_finding(&self, id: &str) -> CorrelationResult<&Finding> {
        self.findings
            .get(id)
            .ok_or_else(|| CorrelationError::NotFound(id.to_string()))
    }

    /// Ids correlated with `id`, in insertion order. Empty for unknown ids or
    /// findings without correlations.
    pub fn get_correlated_finding_ids(&self, id: &str) -> &[String] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_correlated(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .map(|list| list.iter().any(|n| n == b))
            .unwrap_or(false)
    }

    pub fn correlation_score(&self, a: &str, b: &str) -> Option<CorrelationScore> {
        let (lo, hi) = canonical_pair(a, b);
        self.scores.get(&(lo.to_string(), hi.to_string())).copied()
    }

    /// Number of findings correlated with `id`.
    pub fn degree(&self, id: &str) -> usize {
        self.get_correlated_finding_ids(id).len()
    }

    /// Findings with at least one correlation, in the order they gained one.
    pub fn correlated_findings(&self) -> impl Iterator<Item = &Finding> {
        self.adjacency_order
            .iter()
            .filter_map(move |id| self.findings.get(id))
    }

    /// All findings in insertion order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.finding_order
            .iter()
            .filter_map(move |id| self.findings.get(id))
    }

    pub fn findings_of_log_type<'a>(&'a self, log_type: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings().filter(move |f| f.log_type == log_type)
    }

    /// Distinct log types in first-seen order.
    pub fn log_types(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.findings()
            .filter_map(|f| {
                if seen.insert(f.log_type.as_str()) {
                    Some(f.log_type.as_str())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Every correlation once, smaller id first.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.pair_count);
        for id in &self.adjacency_order {
            for neighbor in self.get_correlated_finding_ids(id) {
                if id.as_str() < neighbor.as_str() {
                    pairs.push((id.as_str(), neighbor.as_str()));
                }
            }
        }
        pairs
    }

    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }

    pub fn correlation_count(&self) -> usize {
        self.pair_count
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}
