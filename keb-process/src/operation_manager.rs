//! Shared persist-or-retry helpers for steps

use std::sync::Arc;
use std::time::Duration;

use keb_models::{OperationState, UpgradeKymaOperation};

use crate::step::{StepError, StepResult};
use crate::storage::Operations;

/// Interval after which a step is retried when the store itself fails.
const STORAGE_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Wraps the operation store with the bookkeeping every step needs:
/// marking terminal states and persisting intermediate progress.
#[derive(Clone)]
pub struct OperationManager {
    operations: Arc<dyn Operations>,
}

impl OperationManager {
    pub fn new(operations: Arc<dyn Operations>) -> Self {
        Self { operations }
    }

    /// Mark the operation permanently failed, persist it and hand the
    /// error back to the queue. The queue will not reschedule.
    pub async fn operation_failed(
        &self,
        mut operation: UpgradeKymaOperation,
        description: impl Into<String>,
    ) -> StepResult {
        let description = description.into();
        operation.operation.state = Some(OperationState::Failed);
        operation.operation.description = if operation.operation.description.is_empty() {
            description.clone()
        } else {
            format!("{}; {}", operation.operation.description, description)
        };

        if let Err(err) = self
            .operations
            .update_upgrade_kyma_operation(operation)
            .await
        {
            tracing::error!(error = %err, "unable to persist failed operation");
        }
        Err(StepError::new(description))
    }

    /// Mark the operation succeeded and persist it.
    pub async fn operation_succeeded(&self, mut operation: UpgradeKymaOperation) -> StepResult {
        operation.operation.state = Some(OperationState::Succeeded);
        let (operation, when) = self.update_operation(operation).await;
        Ok((operation, when))
    }

    /// Persist intermediate progress. On a store fault the unchanged
    /// operation is handed back with a retry delay, so no progress is lost.
    pub async fn update_operation(
        &self,
        operation: UpgradeKymaOperation,
    ) -> (UpgradeKymaOperation, Duration) {
        match self
            .operations
            .update_upgrade_kyma_operation(operation.clone())
            .await
        {
            Ok(stored) => (stored, Duration::ZERO),
            Err(err) => {
                tracing::warn!(
                    operation_id = %operation.operation.id,
                    error = %err,
                    "unable to persist operation, retrying"
                );
                (operation, STORAGE_RETRY_INTERVAL)
            }
        }
    }

    /// Ask the queue to invoke the step again after `retry_after`.
    pub async fn retry_operation(
        &self,
        operation: UpgradeKymaOperation,
        reason: &str,
        retry_after: Duration,
    ) -> StepResult {
        tracing::info!(
            operation_id = %operation.operation.id,
            retry_after_secs = retry_after.as_secs(),
            reason,
            "retrying operation"
        );
        Ok((operation, retry_after))
    }
}
