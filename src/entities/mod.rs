//! Capability-level query and analysis workflows used by the CLI and MCP tools.

pub(crate) mod adverse_event;
pub(crate) mod batch;
pub(crate) mod interaction;
pub(crate) mod label;
pub(crate) mod profile;
pub(crate) mod recall;
pub(crate) mod shortage;

use serde::{Deserialize, Serialize};

/// Coarse supply-risk classification shared by the trend and batch reports.
/// `Unknown` marks a per-drug analysis that failed, never a real assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RiskLevel;

    #[test]
    fn risk_level_serializes_as_plain_label() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::High).unwrap(),
            "\"High\""
        );
        assert_eq!(RiskLevel::Unknown.as_str(), "Unknown");
    }
}
