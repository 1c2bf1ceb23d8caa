//! Log-type and severity filters for the AllFindings view, plus the short
//! labels drawn inside nodes.

use serde::{Deserialize, Serialize};

use crate::{Finding, Severity};

/// Log types the console knows about out of the box.
pub const KNOWN_LOG_TYPES: [&str; 13] = [
    "ad_ldap",
    "apache_access",
    "azure",
    "cloudtrail",
    "dns",
    "github",
    "gworkspace",
    "linux",
    "m365",
    "network",
    "okta",
    "s3",
    "windows",
];

/// One checkbox in a filter group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterItem {
    pub id: String,
    pub label: String,
    pub checked: bool,
}

impl FilterItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, checked: bool) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            checked,
        }
    }
}

/// One checked item per known log type.
pub fn default_log_type_filter_items() -> Vec<FilterItem> {
    KNOWN_LOG_TYPES
        .iter()
        .map(|lt| FilterItem::new(*lt, *lt, true))
        .collect()
}

/// One checked item per severity.
pub fn default_severity_filter_items() -> Vec<FilterItem> {
    Severity::ALL
        .iter()
        .map(|s| FilterItem::new(s.as_str(), s.as_str(), true))
        .collect()
}

/// True when `value` appears checked in `items`, or when there is no filter.
pub fn is_admitted(items: Option<&[FilterItem]>, value: &str) -> bool {
    match items {
        None => true,
        Some(items) => items.iter().any(|i| i.checked && i.id == value),
    }
}

/// Combined log-type and severity check for one finding.
///
/// A finding without a rule has no severity and is only admitted when no
/// severity filter is active.
pub fn admits_finding(
    finding: &Finding,
    log_types: Option<&[FilterItem]>,
    severities: Option<&[FilterItem]>,
) -> bool {
    if !is_admitted(log_types, &finding.log_type) {
        return false;
    }
    match (severities, finding.severity()) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(items), Some(sev)) => is_admitted(Some(items), sev.as_str()),
    }
}

/// Short label drawn inside a node.
pub fn abbreviation_for_log_type(log_type: &str) -> String {
    let abbr = match log_type.to_ascii_lowercase().as_str() {
        "dns" => "DNS",
        "s3" => "S3",
        "windows" => "WIN",
        "cloudtrail" => "CT",
        "ad_ldap" => "AD",
        "apache_access" => "APA",
        "azure" => "AZR",
        "github" => "GH",
        "gworkspace" => "GWS",
        "linux" => "LNX",
        "m365" => "M365",
        "network" => "NET",
        "okta" => "OKTA",
        other => return other.chars().take(3).collect::<String>().to_ascii_uppercase(),
    };
    abbr.to_string()
}
