//! Open Service Broker surface types and errors

mod suspension;
mod update;

pub use suspension::SuspensionContextHandler;
pub use update::UpdateEndpoint;

use async_trait::async_trait;
use keb_models::{ERSContext, Instance};
use keb_process::storage::StorageError;
use serde::{Deserialize, Serialize};

/// Body of a PATCH /v2/service_instances/{id} request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDetails {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    /// Kept raw; anything that is not a JSON object is rejected.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub previous_values: Option<PreviousValues>,
    #[serde(default)]
    pub maintenance_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviousValues {
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub space_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateResponse {
    pub is_async: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("instance {0} does not exist")]
    InstanceNotFound(String),
    #[error("this broker only handles asynchronous requests")]
    AsyncRequired,
    #[error("context is not a JSON object")]
    MalformedContext,
    #[error("no service-manager credentials found in the operation history")]
    MissingCredentials,
    #[error("update handler failed: {0}")]
    UpdateFailed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Receives the updated instance together with the caller's context,
/// exactly as sent. Orchestrating any follow-on operation is the handler's
/// concern; returning an operation id makes the update asynchronous.
#[async_trait]
pub trait ContextUpdateHandler: Send + Sync {
    async fn handle(
        &self,
        instance: &Instance,
        context: &ERSContext,
    ) -> anyhow::Result<Option<String>>;
}
