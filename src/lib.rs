//! # Finding Correlations - Core Library
//!
//! Correlation graph engine for a security-analytics console.
//!
//! Detectors produce findings over log indices; the backend correlates
//! findings that come from different log types. This crate models those
//! pairwise relationships and projects them into a renderer-ready graph
//! with a two-level drill-down:
//!
//! - **AllFindings**: one node per correlated finding, sized by its degree.
//! - **Finding**: a single finding and its direct correlations, with scores.
//!
//! ## Pieces
//! - [`colors::ColorProvider`] - stable color per log type.
//! - [`index::FindingCorrelationIndex`] - findings + symmetric adjacency.
//! - [`graph`] - pure projection from the index to nodes and edges.
//! - [`level::CorrelationLevelStateMachine`] - drill-down state and history.
//! - [`store::CorrelationStore`] - the facade UI containers talk to.
//! - [`window::TimeWindow`] - the timestamp range a refresh covers.
//!
//! Rendering, persistence and the search cluster behind it are external
//! collaborators, reached through the [`source::FindingsSource`] and
//! [`rules::RuleRepository`] seams.

pub mod api;
pub mod colors;
pub mod filters;
pub mod fixtures;
pub mod graph;
pub mod index;
pub mod level;
pub mod rules;
pub mod source;
pub mod store;
pub mod window;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for the correlation engine.
#[derive(Error, Debug)]
pub enum CorrelationError {
    #[error("Finding not found: {0}")]
    NotFound(String),

    #[error("Duplicate finding id: {0}")]
    DuplicateFinding(String),

    #[error("Invalid correlation: {0}")]
    InvalidCorrelation(String),

    #[error("Invalid correlation rule: {0}")]
    Validation(String),

    #[error("Operation not available at the current level: {0}")]
    WrongLevel(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Stale fetch result discarded (ticket {ticket}, current generation {current})")]
    StaleFetch { ticket: u64, current: u64 },

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fixture generation error: {0}")]
    Fixture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type CorrelationResult<T> = Result<T, CorrelationError>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// Loaded from `finding-correlations.toml` or a path supplied via CLI flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationsConfig {
    /// Visual policy constants attached to every built graph.
    pub graph: GraphConfig,

    /// Synthetic data used when no upstream source is configured.
    pub fixtures: FixtureConfig,

    /// Color palette override.
    #[serde(default)]
    pub palette: PaletteConfig,

    /// Time window findings are fetched for.
    #[serde(default)]
    pub window: TimeWindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Smallest node radius the renderer should draw.
    pub node_min_size: f64,

    /// Largest node radius the renderer should draw.
    pub node_max_size: f64,

    /// Label font size range.
    pub label_min: f64,
    pub label_max: f64,

    /// Label font size cap while zoomed in.
    pub label_max_visible: f64,

    /// Labels below this on-screen size are hidden at the AllFindings level.
    /// Kept high so dense graphs do not turn into text soup.
    pub all_findings_draw_threshold: f64,

    /// Draw threshold at the Finding level. Low enough that labels always show.
    pub finding_draw_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// RNG seed. The same seed always yields the same index.
    pub seed: u64,

    /// Log types to generate findings for.
    pub log_types: Vec<String>,

    /// Findings generated per log type.
    pub findings_per_log_type: usize,

    /// Target number of distinct correlated pairs.
    pub correlation_count: usize,

    /// Upper bound on pair draws before the generator gives up.
    pub max_pair_attempts: usize,
}

/// Fetch window. Unset bounds are relative to the moment the store is built:
/// `end` defaults to now, `start` to `lookback_hours` before `end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindowConfig {
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

fn default_lookback_hours() -> i64 {
    24
}

impl Default for TimeWindowConfig {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback_hours(),
            start: None,
            end: None,
        }
    }
}

impl TimeWindowConfig {
    /// Concrete window as of `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> CorrelationResult<window::TimeWindow> {
        let end = self.end.unwrap_or(now);
        let start = match self.start {
            Some(start) => start,
            None => Duration::try_hours(self.lookback_hours)
                .and_then(|lookback| end.checked_sub_signed(lookback))
                .ok_or_else(|| {
                    CorrelationError::InvalidWindow(format!(
                        "lookback of {} hours is out of range",
                        self.lookback_hours
                    ))
                })?,
        };
        window::TimeWindow::from_bounds(start, end, now)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Replacement palette. Empty means the built-in palette.
    #[serde(default)]
    pub colors: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_min_size: 10.0,
            node_max_size: 30.0,
            label_min: 10.0,
            label_max: 20.0,
            label_max_visible: 20.0,
            all_findings_draw_threshold: 12.0,
            finding_draw_threshold: 1.0,
        }
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            log_types: ["dns", "s3", "windows", "cloudtrail", "ad_ldap"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            findings_per_log_type: 4,
            correlation_count: 12,
            max_pair_attempts: 10_000,
        }
    }
}

impl Default for CorrelationsConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            fixtures: FixtureConfig::default(),
            palette: PaletteConfig::default(),
            window: TimeWindowConfig::default(),
        }
    }
}

impl CorrelationsConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> CorrelationResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CorrelationsConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to a TOML file.
    pub fn write_default(path: &std::path::Path) -> CorrelationResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| CorrelationError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject ranges the renderer cannot use.
    pub fn validate(&self) -> CorrelationResult<()> {
        if self.graph.node_min_size > self.graph.node_max_size {
            return Err(CorrelationError::Config(format!(
                "node_min_size {} exceeds node_max_size {}",
                self.graph.node_min_size, self.graph.node_max_size
            )));
        }
        if self.graph.label_min > self.graph.label_max {
            return Err(CorrelationError::Config(format!(
                "label_min {} exceeds label_max {}",
                self.graph.label_min, self.graph.label_max
            )));
        }
        if self.window.lookback_hours <= 0 {
            return Err(CorrelationError::Config(format!(
                "window.lookback_hours must be positive, got {}",
                self.window.lookback_hours
            )));
        }
        if let (Some(start), Some(end)) = (self.window.start, self.window.end) {
            if start > end {
                return Err(CorrelationError::Config(format!(
                    "window.start {} is after window.end {}",
                    start, end
                )));
            }
        }
        self.fixtures.validate()
    }
}

impl FixtureConfig {
    /// Log types must be distinct, since finding ids are derived from them.
    pub fn validate(&self) -> CorrelationResult<()> {
        let mut seen = HashSet::new();
        for log_type in &self.log_types {
            if !seen.insert(log_type.as_str()) {
                return Err(CorrelationError::Config(format!(
                    "fixtures.log_types lists '{}' more than once",
                    log_type
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Core Types
// ---------------------------------------------------------------------------

/// Rule severity as reported by the detector that produced a finding.
///
/// Serialized lowercase. Deserialized through [`FromStr`], so upstream
/// documents may use any case or the numeric levels `"1"` to `"5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Informational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Informational => "informational",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CorrelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" | "1" => Ok(Severity::Critical),
            "high" | "2" => Ok(Severity::High),
            "medium" | "3" => Ok(Severity::Medium),
            "low" | "4" => Ok(Severity::Low),
            "informational" | "info" | "5" => Ok(Severity::Informational),
            other => Err(CorrelationError::Validation(format!("unknown severity '{}'", other))),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = CorrelationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The detection rule that matched to produce a finding. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRule {
    pub id: String,
    pub name: String,
    pub severity: Severity,
}

/// A security finding. Read-only inside this crate; identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,

    /// Log type category (`dns`, `s3`, `windows`, ...).
    pub log_type: String,

    /// Optional display name. Falls back to `id` in tooltips.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub rule: Option<DetectionRule>,
}

impl Finding {
    pub fn new(id: impl Into<String>, log_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log_type: log_type.into(),
            name: None,
            timestamp: None,
            rule: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_rule(mut self, rule: DetectionRule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn severity(&self) -> Option<Severity> {
        self.rule.as_ref().map(|r| r.severity)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Where a correlation score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrigin {
    /// Reported by the correlation engine in the cluster.
    Backend,
    /// Synthetic value from the fixture generator. Not a real measurement.
    Placeholder,
}

/// Correlation strength in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationScore {
    pub value: f64,
    pub origin: ScoreOrigin,
}

impl CorrelationScore {
    /// Backend score, clamped to [0.0, 1.0].
    pub fn backend(value: f64) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            origin: ScoreOrigin::Backend,
        }
    }

    pub fn placeholder(value: f64) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            origin: ScoreOrigin::Placeholder,
        }
    }
}

/// One undirected correlation as delivered by an upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub score: Option<f64>,
}

impl CorrelationPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}
