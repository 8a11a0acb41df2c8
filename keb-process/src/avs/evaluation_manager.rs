use std::sync::Arc;
use std::time::Duration;

use keb_models::{EvaluationStatus, UpgradeKymaOperation};

use crate::avs::{DelegateResult, EvalScope, StatusDelegator};

/// Coordinates maintenance mode across the internal and external monitor.
///
/// Every verb short-circuits on the first delegator delay or error, so a
/// retried invocation resumes at the monitor that has not been handled yet.
pub struct EvaluationManager {
    delegator: Arc<dyn StatusDelegator>,
}

impl EvaluationManager {
    pub fn new(delegator: Arc<dyn StatusDelegator>) -> Self {
        Self { delegator }
    }

    /// Drive every monitor that is not yet in maintenance to `status`.
    pub async fn set_status(
        &self,
        status: EvaluationStatus,
        mut operation: UpgradeKymaOperation,
    ) -> DelegateResult {
        for scope in EvalScope::ALL {
            if scope.is_in_maintenance(&operation.operation.instance_details.avs) {
                continue;
            }
            let (updated, delay) = self.delegator.set_status(operation, scope, status).await?;
            if !delay.is_zero() {
                return Ok((updated, delay));
            }
            operation = updated;
        }
        Ok((operation, Duration::ZERO))
    }

    pub async fn set_maintenance_status(
        &self,
        operation: UpgradeKymaOperation,
    ) -> DelegateResult {
        self.set_status(EvaluationStatus::Maintenance, operation).await
    }

    /// Revert every monitor currently in maintenance to its prior status.
    pub async fn restore_status(
        &self,
        mut operation: UpgradeKymaOperation,
    ) -> DelegateResult {
        for scope in EvalScope::ALL {
            if !scope.is_in_maintenance(&operation.operation.instance_details.avs) {
                continue;
            }
            let (updated, delay) = self.delegator.reset_status(operation, scope).await?;
            if !delay.is_zero() {
                return Ok((updated, delay));
            }
            operation = updated;
        }
        Ok((operation, Duration::ZERO))
    }

    /// True when every valid monitor is in maintenance. Vacuously true for
    /// an operation without monitors.
    pub fn in_maintenance(&self, operation: &UpgradeKymaOperation) -> bool {
        let avs = &operation.operation.instance_details.avs;
        EvalScope::ALL
            .iter()
            .filter(|scope| scope.is_valid(avs))
            .all(|scope| scope.is_in_maintenance(avs))
    }

    pub fn has_monitors(&self, operation: &UpgradeKymaOperation) -> bool {
        let avs = &operation.operation.instance_details.avs;
        EvalScope::ALL.iter().any(|scope| scope.is_valid(avs))
    }
}
