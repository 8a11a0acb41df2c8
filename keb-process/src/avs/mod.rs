//! AVS monitor maintenance handling
//!
//! During an upgrade both uptime monitors of a runtime are parked in
//! MAINTENANCE so the availability service does not page on the expected
//! blip, then restored to whatever they were before. [`EvaluationManager`]
//! drives the two monitors; [`Delegator`] talks to the AVS API and persists
//! the resulting monitor state on the operation.

mod delegator;
mod evaluation_manager;

pub use delegator::{
    AvsClient, AvsClientError, DelegateResult, Delegator, HttpAvsClient, StatusDelegator,
};
pub use evaluation_manager::EvaluationManager;

use keb_models::{AvsEvaluationStatus, AvsLifecycleData, EvaluationStatus};

/// AVS API endpoint and credentials, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AvsConfig {
    pub api_endpoint: String,
    pub api_key: String,
}

/// Selects one of the two monitors of a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalScope {
    Internal,
    External,
}

impl EvalScope {
    pub const ALL: [EvalScope; 2] = [EvalScope::Internal, EvalScope::External];

    pub fn evaluation_id(&self, avs: &AvsLifecycleData) -> i64 {
        match self {
            EvalScope::Internal => avs.internal_evaluation_id,
            EvalScope::External => avs.external_evaluation_id,
        }
    }

    /// A monitor exists only once provisioning assigned it an id.
    pub fn is_valid(&self, avs: &AvsLifecycleData) -> bool {
        self.evaluation_id(avs) != 0
    }

    pub fn status<'a>(&self, avs: &'a AvsLifecycleData) -> &'a AvsEvaluationStatus {
        match self {
            EvalScope::Internal => &avs.internal_evaluation_status,
            EvalScope::External => &avs.external_evaluation_status,
        }
    }

    pub fn status_mut<'a>(&self, avs: &'a mut AvsLifecycleData) -> &'a mut AvsEvaluationStatus {
        match self {
            EvalScope::Internal => &mut avs.internal_evaluation_status,
            EvalScope::External => &mut avs.external_evaluation_status,
        }
    }

    pub fn is_in_maintenance(&self, avs: &AvsLifecycleData) -> bool {
        self.status(avs).current == Some(EvaluationStatus::Maintenance)
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvalScope::Internal => "internal",
            EvalScope::External => "external",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_validity_follows_evaluation_id() {
        let mut avs = AvsLifecycleData::default();
        assert!(!EvalScope::Internal.is_valid(&avs));
        assert!(!EvalScope::External.is_valid(&avs));

        avs.internal_evaluation_id = 1234;
        assert!(EvalScope::Internal.is_valid(&avs));
        assert!(!EvalScope::External.is_valid(&avs));
    }

    #[test]
    fn test_maintenance_check_reads_current_status() {
        let mut avs = AvsLifecycleData {
            external_evaluation_id: 5678,
            ..Default::default()
        };
        assert!(!EvalScope::External.is_in_maintenance(&avs));

        EvalScope::External.status_mut(&mut avs).current = Some(EvaluationStatus::Maintenance);
        assert!(EvalScope::External.is_in_maintenance(&avs));
    }
}
