//! # Synthetic Correlation Fixtures
//!
//! Seeded generator for demo and test data. It only ever produces an
//! ordinary [`FindingCorrelationIndex`], so fixture data and backend data
//! go through the same code paths.
//!
//! Pair selection rules:
//! - never a self-pair
//! - never the same unordered pair twice (canonical smaller-larger key)
//! - never two findings of the same log type
//! - redraw until a valid pair is found, bounded by `max_pair_attempts`
//!
//! Asking for more pairs than there are cross-type pairs is rejected up
//! front; otherwise the redraw loop could never reach its target.
//!
//! Scores attached here are random and tagged [`ScoreOrigin::Placeholder`].
//!
//! [`ScoreOrigin::Placeholder`]: crate::ScoreOrigin::Placeholder

use std::collections::HashSet;

use chrono::{DateTime, Duration};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::index::{canonical_pair, FindingCorrelationIndex};
use crate::{
    CorrelationError, CorrelationResult, CorrelationScore, DetectionRule, Finding, FixtureConfig,
    Severity,
};

/// 2026-01-01T00:00:00Z. Fixed so generated timestamps are reproducible.
const FIXTURE_EPOCH_SECS: i64 = 1_767_225_600;

/// Timestamps spread over one day after the epoch.
const FIXTURE_SPREAD_SECS: i64 = 86_400;

/// Number of unordered pairs whose endpoints have different log types:
/// one pair per two distinct types, times `per_type` squared. Assumes the
/// log types are distinct.
pub fn cross_type_pair_capacity(config: &FixtureConfig) -> CorrelationResult<usize> {
    let per_type = config.findings_per_log_type;
    let types = config.log_types.len();
    types
        .checked_mul(types.saturating_sub(1))
        .map(|n| n / 2)
        .and_then(|type_pairs| type_pairs.checked_mul(per_type))
        .and_then(|n| n.checked_mul(per_type))
        .ok_or_else(|| {
            CorrelationError::Fixture(format!(
                "{} log types x {} findings each is too large to pair",
                types, per_type
            ))
        })
}

/// Generate a seeded index.
pub fn generate(config: &FixtureConfig) -> CorrelationResult<FindingCorrelationIndex> {
    config.validate()?;
    let capacity = cross_type_pair_capacity(config)?;
    if config.correlation_count > capacity {
        return Err(CorrelationError::Fixture(format!(
            "requested {} correlations but only {} cross-log-type pairs exist",
            config.correlation_count, capacity
        )));
    }

    let epoch = DateTime::from_timestamp(FIXTURE_EPOCH_SECS, 0)
        .ok_or_else(|| CorrelationError::Fixture("invalid fixture epoch".to_string()))?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut index = FindingCorrelationIndex::new();

    let mut findings: Vec<(String, String)> = Vec::new();
    for log_type in &config.log_types {
        for n in 1..=config.findings_per_log_type {
            let id = format!("{}-{}", log_type, n);
            let severity = Severity::ALL[rng.gen_range(0..Severity::ALL.len())];
            let offset = Duration::seconds(rng.gen_range(0..FIXTURE_SPREAD_SECS));
            let finding = Finding::new(id.clone(), log_type.clone())
                .with_name(format!("{} finding {}", log_type, n))
                .with_timestamp(epoch + offset)
                .with_rule(DetectionRule {
                    id: format!("rule-{}-{}", log_type, n),
                    name: format!("Sample {} rule {}", log_type, n),
                    severity,
                });
            index.insert_finding(finding)?;
            findings.push((id, log_type.clone()));
        }
    }

    if findings.len() < 2 || config.correlation_count == 0 {
        return Ok(index);
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut attempts = 0usize;
    while seen.len() < config.correlation_count {
        if attempts >= config.max_pair_attempts {
            log::warn!(
                "Fixture generator stopped after {} attempts with {}/{} correlations",
                attempts,
                seen.len(),
                config.correlation_count
            );
            break;
        }
        attempts += 1;

        let i = rng.gen_range(0..findings.len());
        let j = rng.gen_range(0..findings.len());
        if i == j {
            continue;
        }
        let (a, a_type) = &findings[i];
        let (b, b_type) = &findings[j];
        if a_type == b_type {
            continue;
        }
        let (lo, hi) = canonical_pair(a, b);
        let key = (lo.to_string(), hi.to_string());
        if seen.contains(&key) {
            continue;
        }

        let score = CorrelationScore::placeholder(rng.gen::<f64>());
        index.add_correlation(lo, hi, Some(score))?;
        seen.insert(key);
    }

    log::debug!(
        "Generated {} findings and {} correlations (seed {}, {} draws)",
        index.finding_count(),
        index.correlation_count(),
        config.seed,
        attempts
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoreOrigin;

    fn config(correlations: usize) -> FixtureConfig {
        FixtureConfig {
            correlation_count: correlations,
            ..FixtureConfig::default()
        }
    }

    #[test]
    fn test_capacity() {
        let cfg = FixtureConfig {
            log_types: vec!["dns".into(), "s3".into()],
            findings_per_log_type: 3,
            ..FixtureConfig::default()
        };
        // 6 findings -> 15 pairs, minus 3 + 3 same-type pairs
        assert_eq!(cross_type_pair_capacity(&cfg).unwrap(), 9);
    }

    #[test]
    fn test_capacity_overflow_is_fixture_error() {
        let cfg = FixtureConfig {
            log_types: vec!["dns".into(), "s3".into(), "windows".into()],
            findings_per_log_type: usize::MAX / 2,
            ..FixtureConfig::default()
        };
        assert!(matches!(cross_type_pair_capacity(&cfg), Err(CorrelationError::Fixture(_))));
        assert!(matches!(generate(&cfg), Err(CorrelationError::Fixture(_))));
    }

    #[test]
    fn test_duplicate_log_types_rejected_before_generation() {
        let cfg = FixtureConfig {
            log_types: vec!["dns".into(), "s3".into(), "dns".into()],
            findings_per_log_type: 2,
            correlation_count: 1,
            ..FixtureConfig::default()
        };
        let err = generate(&cfg).unwrap_err();
        assert!(matches!(err, CorrelationError::Config(ref msg) if msg.contains("dns")), "{}", err);
    }

    #[test]
    fn test_generated_pairs_cross_log_types() {
        let index = generate(&config(20)).unwrap();
        assert_eq!(index.correlation_count(), 20);
        for (a, b) in index.pairs() {
            let fa = index.get_finding(a).unwrap();
            let fb = index.get_finding(b).unwrap();
            assert_ne!(fa.log_type, fb.log_type, "{} and {} share a log type", a, b);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_generation_is_seeded() {
        let first = generate(&config(10)).unwrap();
        let second = generate(&config(10)).unwrap();
        assert_eq!(first.pairs(), second.pairs());
    }

    #[test]
    fn test_generated_scores_are_placeholders() {
        let index = generate(&config(5)).unwrap();
        for (a, b) in index.pairs() {
            let score = index.correlation_score(a, b).unwrap();
            assert_eq!(score.origin, ScoreOrigin::Placeholder);
            assert!((0.0..=1.0).contains(&score.value));
        }
    }

    #[test]
    fn test_full_capacity_terminates() {
        let cfg = FixtureConfig {
            log_types: vec!["dns".into(), "s3".into()],
            findings_per_log_type: 2,
            correlation_count: 4,
            ..FixtureConfig::default()
        };
        let index = generate(&cfg).unwrap();
        assert_eq!(index.correlation_count(), 4);
    }

    #[test]
    fn test_over_capacity_rejected() {
        let cfg = FixtureConfig {
            log_types: vec!["dns".into(), "s3".into()],
            findings_per_log_type: 2,
            correlation_count: 5,
            ..FixtureConfig::default()
        };
        assert!(matches!(generate(&cfg), Err(CorrelationError::Fixture(_))));
    }

    #[test]
    fn test_attempt_cap_returns_partial() {
        let cfg = FixtureConfig {
            max_pair_attempts: 1,
            ..config(10)
        };
        let index = generate(&cfg).unwrap();
        assert!(index.correlation_count() <= 1);
    }
}
