//! # Correlation Rules
//!
//! User-authored definitions of which log types correlate, and on which
//! field conditions. Rules are validated on create and kept in insertion
//! order. Storage sits behind [`RuleRepository`]; the in-memory
//! implementation lives only as long as the process.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{CorrelationError, CorrelationResult};

/// Document field names: dotted paths such as `process.name` or `@timestamp`.
static RE_FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_@][A-Za-z0-9_.@\-]*$").expect("regex"));

/// Boolean operator joining a condition to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFieldCondition {
    pub name: String,
    pub value: serde_json::Value,
    pub condition: ConditionOperator,
}

/// One log type taking part in a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRuleField {
    pub log_type: String,
    #[serde(default)]
    pub conditions: Vec<CorrelationFieldCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRule {
    pub name: String,
    pub fields: Vec<CorrelationRuleField>,
}

impl CorrelationRule {
    /// Check the rule's shape. A rule needs a name and at least two log
    /// types; every condition needs a field name and a non-empty value.
    pub fn validate(&self) -> CorrelationResult<()> {
        if self.name.trim().is_empty() {
            return Err(CorrelationError::Validation("rule name is empty".to_string()));
        }
        if self.fields.len() < 2 {
            return Err(CorrelationError::Validation(format!(
                "rule '{}' needs at least two log types, got {}",
                self.name,
                self.fields.len()
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.log_type.trim().is_empty() {
                return Err(CorrelationError::Validation(format!(
                    "rule '{}' field {} has no log type",
                    self.name, i
                )));
            }
            for condition in &field.conditions {
                if !RE_FIELD_NAME.is_match(&condition.name) {
                    return Err(CorrelationError::Validation(format!(
                        "rule '{}' has an invalid field name '{}' for log type {}",
                        self.name, condition.name, field.log_type
                    )));
                }
                let empty = match &condition.value {
                    serde_json::Value::Null => true,
                    serde_json::Value::String(s) => s.trim().is_empty(),
                    _ => false,
                };
                if empty {
                    return Err(CorrelationError::Validation(format!(
                        "rule '{}' condition on '{}' has no value",
                        self.name, condition.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Log types in field order.
    pub fn log_types(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.log_type.as_str()).collect()
    }
}

/// Row in the rules table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRuleTableItem {
    pub name: String,
    /// Comma-joined log types.
    pub log_types: String,
}

impl From<&CorrelationRule> for CorrelationRuleTableItem {
    fn from(rule: &CorrelationRule) -> Self {
        Self {
            name: rule.name.clone(),
            log_types: rule.log_types().join(","),
        }
    }
}

/// Rules that mention any of `log_types`. `None` returns every rule.
pub fn filter_rules_by_log_types<'a>(
    rules: &'a [CorrelationRule],
    log_types: Option<&[String]>,
) -> Vec<&'a CorrelationRule> {
    match log_types {
        None => rules.iter().collect(),
        Some(types) => {
            let wanted: HashSet<&str> = types.iter().map(String::as_str).collect();
            rules
                .iter()
                .filter(|r| r.fields.iter().any(|f| wanted.contains(f.log_type.as_str())))
                .collect()
        }
    }
}

/// Storage for correlation rules. A deployment with a real backend plugs
/// in here; the store only ever creates and lists.
pub trait RuleRepository {
    fn create(&mut self, rule: CorrelationRule) -> CorrelationResult<()>;

    /// All rules in creation order.
    fn list(&self) -> &[CorrelationRule];
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Vec<CorrelationRule>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleRepository for InMemoryRuleRepository {
    fn create(&mut self, rule: CorrelationRule) -> CorrelationResult<()> {
        self.rules.push(rule);
        Ok(())
    }

    fn list(&self) -> &[CorrelationRule] {
        &self.rules
    }
}
