//! # Upstream Findings Source
//!
//! Where findings and correlations come from. The search cluster that owns
//! them is out of reach of this crate; anything that can hand back both
//! lists implements [`FindingsSource`]. Failures are returned as
//! [`CorrelationError::UpstreamFetch`] so callers can tell "fetch failed"
//! apart from "no correlations".
//!
//! Every fetch is scoped to a [`TimeWindow`]. Findings stamped outside it
//! are dropped, together with any pair that loses an endpoint.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;
use crate::{CorrelationError, CorrelationPair, CorrelationResult, Finding};

#[async_trait]
pub trait FindingsSource: Send + Sync {
    /// Findings whose timestamp falls inside `window`.
    async fn fetch_findings(&self, window: &TimeWindow) -> CorrelationResult<Vec<Finding>>;

    /// Correlated pairs between findings inside `window`.
    async fn fetch_correlations(&self, window: &TimeWindow) -> CorrelationResult<Vec<CorrelationPair>>;

    /// Both lists for one refresh. Sources that can answer in a single
    /// round trip should override this.
    async fn fetch(&self, window: &TimeWindow) -> CorrelationResult<FindingsDocument> {
        let findings = self.fetch_findings(window).await?;
        let correlations = self.fetch_correlations(window).await?;
        Ok(FindingsDocument { findings, correlations })
    }
}

/// On-disk document read by [`JsonFileSource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsDocument {
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub correlations: Vec<CorrelationPair>,
}

impl FindingsDocument {
    /// Restrict to `window`. Untimestamped findings stay, and only pairs
    /// touching a dropped finding go; dangling ids are left for the index
    /// to reject.
    pub fn within(mut self, window: &TimeWindow) -> Self {
        let (kept, dropped): (Vec<Finding>, Vec<Finding>) = self
            .findings
            .into_iter()
            .partition(|f| window.admits(f.timestamp));
        let dropped: HashSet<String> = dropped.into_iter().map(|f| f.id).collect();
        self.findings = kept;
        if !dropped.is_empty() {
            self.correlations
                .retain(|p| !dropped.contains(&p.a) && !dropped.contains(&p.b));
        }
        self
    }
}

/// Reads `{ "findings": [...], "correlations": [...] }` from a file.
/// The file is read once per refresh so edits show up on the next one.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> CorrelationResult<FindingsDocument> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CorrelationError::UpstreamFetch(format!("reading {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CorrelationError::UpstreamFetch(format!("malformed document {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl FindingsSource for JsonFileSource {
    async fn fetch_findings(&self, window: &TimeWindow) -> CorrelationResult<Vec<Finding>> {
        Ok(self.fetch(window).await?.findings)
    }

    async fn fetch_correlations(&self, window: &TimeWindow) -> CorrelationResult<Vec<CorrelationPair>> {
        Ok(self.fetch(window).await?.correlations)
    }

    async fn fetch(&self, window: &TimeWindow) -> CorrelationResult<FindingsDocument> {
        let loaded = self.load().await?;
        let total = loaded.findings.len();
        let doc = loaded.within(window);
        log::debug!(
            "Loaded {} of {} findings and {} correlations from {}",
            doc.findings.len(),
            total,
            doc.correlations.len(),
            self.path.display()
        );
        Ok(doc)
    }
}

/// Fixed data held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub document: FindingsDocument,
}

impl StaticSource {
    pub fn new(findings: Vec<Finding>, correlations: Vec<CorrelationPair>) -> Self {
        Self {
            document: FindingsDocument { findings, correlations },
        }
    }
}

#[async_trait]
impl FindingsSource for StaticSource {
    async fn fetch_findings(&self, window: &TimeWindow) -> CorrelationResult<Vec<Finding>> {
        Ok(self.fetch(window).await?.findings)
    }

    async fn fetch_correlations(&self, window: &TimeWindow) -> CorrelationResult<Vec<CorrelationPair>> {
        Ok(self.fetch(window).await?.correlations)
    }

    async fn fetch(&self, window: &TimeWindow) -> CorrelationResult<FindingsDocument> {
        Ok(self.document.clone().within(window))
    }
}
