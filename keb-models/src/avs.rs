//! AVS (availability service) monitor sub-state
//!
//! Every runtime has up to two uptime monitors, internal and external. The
//! broker records the evaluation ids and the current/original status of each
//! so upgrade steps can park monitors in MAINTENANCE and restore them later.

use serde::{Deserialize, Serialize};

/// Status of a single AVS evaluation, as the AVS API spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStatus {
    Active,
    Maintenance,
    Inactive,
    Deleted,
}

/// Current and pre-change status of one monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvsEvaluationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<EvaluationStatus>,
    /// Status the monitor had before the last SetStatus, used by restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<EvaluationStatus>,
}

/// AVS lifecycle data persisted inside the operation's instance details.
///
/// An evaluation id of 0 means the monitor was never created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvsLifecycleData {
    #[serde(rename = "avs_evaluation_internal_id", default)]
    pub internal_evaluation_id: i64,
    #[serde(rename = "avs_evaluation_external_id", default)]
    pub external_evaluation_id: i64,
    #[serde(rename = "avs_internal_evaluation_status", default)]
    pub internal_evaluation_status: AvsEvaluationStatus,
    #[serde(rename = "avs_external_evaluation_status", default)]
    pub external_evaluation_status: AvsEvaluationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_avs_api_spelling() {
        let json = serde_json::to_string(&EvaluationStatus::Maintenance).unwrap();
        assert_eq!(json, r#""MAINTENANCE""#);
    }

    #[test]
    fn test_missing_fields_default_to_no_monitors() {
        let data: AvsLifecycleData = serde_json::from_str("{}").unwrap();
        assert_eq!(data.internal_evaluation_id, 0);
        assert!(data.external_evaluation_status.current.is_none());
    }
}
