//! Delegator between the upgrade pipeline and the AVS API
//!
//! The delegator owns the side effects of a monitor status change: the AVS
//! API call and persisting the new monitor state on the operation. Callers
//! only see the step-style `(operation, delay)` outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keb_models::{EvaluationStatus, UpgradeKymaOperation};

use crate::avs::{AvsConfig, EvalScope};
use crate::operation_manager::OperationManager;
use crate::step::StepResult;
use crate::storage::Operations;

pub type DelegateResult = StepResult;

/// Delay before the next attempt when the AVS API misbehaves.
const AVS_RETRY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, thiserror::Error)]
#[error("avs client: {0}")]
pub struct AvsClientError(pub String);

/// Thin AVS API surface, just the lifecycle endpoint the delegator needs.
#[async_trait]
pub trait AvsClient: Send + Sync {
    async fn set_status(
        &self,
        evaluation_id: i64,
        status: EvaluationStatus,
    ) -> Result<(), AvsClientError>;
}

/// Status change seam used by [`super::EvaluationManager`].
#[async_trait]
pub trait StatusDelegator: Send + Sync {
    /// Drive one monitor to `status`, remembering the status it had.
    async fn set_status(
        &self,
        operation: UpgradeKymaOperation,
        scope: EvalScope,
        status: EvaluationStatus,
    ) -> DelegateResult;

    /// Revert one monitor to the status recorded by the last `set_status`.
    async fn reset_status(
        &self,
        operation: UpgradeKymaOperation,
        scope: EvalScope,
    ) -> DelegateResult;
}

pub struct Delegator {
    operation_manager: OperationManager,
    client: Arc<dyn AvsClient>,
}

impl Delegator {
    pub fn new(operations: Arc<dyn Operations>, client: Arc<dyn AvsClient>) -> Self {
        Self {
            operation_manager: OperationManager::new(operations),
            client,
        }
    }
}

#[async_trait]
impl StatusDelegator for Delegator {
    async fn set_status(
        &self,
        mut operation: UpgradeKymaOperation,
        scope: EvalScope,
        status: EvaluationStatus,
    ) -> DelegateResult {
        let avs = &operation.operation.instance_details.avs;
        if !scope.is_valid(avs) {
            return Ok((operation, Duration::ZERO));
        }
        if scope.status(avs).current == Some(status) {
            // Already where we want it, possibly from a retried invocation.
            return Ok((operation, Duration::ZERO));
        }

        let evaluation_id = scope.evaluation_id(avs);
        if let Err(err) = self.client.set_status(evaluation_id, status).await {
            return self
                .operation_manager
                .retry_operation(operation, &err.to_string(), AVS_RETRY_INTERVAL)
                .await;
        }

        let monitor = scope.status_mut(&mut operation.operation.instance_details.avs);
        monitor.original = monitor.current;
        monitor.current = Some(status);

        tracing::info!(
            evaluation_id,
            monitor = scope.name(),
            status = ?status,
            "avs monitor status set"
        );
        let (operation, when) = self.operation_manager.update_operation(operation).await;
        Ok((operation, when))
    }

    async fn reset_status(
        &self,
        mut operation: UpgradeKymaOperation,
        scope: EvalScope,
    ) -> DelegateResult {
        let avs = &operation.operation.instance_details.avs;
        if !scope.is_valid(avs) {
            return Ok((operation, Duration::ZERO));
        }

        let Some(original) = scope.status(avs).original else {
            // Nothing recorded to go back to; guessing a status would be worse
            // than failing loudly.
            return self
                .operation_manager
                .operation_failed(
                    operation,
                    format!("no original status recorded for {} monitor", scope.name()),
                )
                .await;
        };

        let evaluation_id = scope.evaluation_id(avs);
        if let Err(err) = self.client.set_status(evaluation_id, original).await {
            return self
                .operation_manager
                .retry_operation(operation, &err.to_string(), AVS_RETRY_INTERVAL)
                .await;
        }

        let monitor = scope.status_mut(&mut operation.operation.instance_details.avs);
        monitor.current = Some(original);
        monitor.original = None;

        tracing::info!(
            evaluation_id,
            monitor = scope.name(),
            status = ?original,
            "avs monitor status restored"
        );
        let (operation, when) = self.operation_manager.update_operation(operation).await;
        Ok((operation, when))
    }
}

/// AVS lifecycle client over HTTP.
pub struct HttpAvsClient {
    http: reqwest::Client,
    config: AvsConfig,
}

impl HttpAvsClient {
    pub fn new(config: AvsConfig) -> Result<Self, AvsClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| AvsClientError(err.to_string()))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl AvsClient for HttpAvsClient {
    async fn set_status(
        &self,
        evaluation_id: i64,
        status: EvaluationStatus,
    ) -> Result<(), AvsClientError> {
        let url = format!(
            "{}/{}/lifecycle",
            self.config.api_endpoint.trim_end_matches('/'),
            evaluation_id
        );
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(|err| AvsClientError(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AvsClientError(format!(
                "unexpected response {} from {url}",
                response.status()
            )));
        }
        Ok(())
    }
}
