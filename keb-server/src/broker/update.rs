//! PATCH /v2/service_instances/{id}
//!
//! Besides plain context updates this endpoint carries suspension and
//! unsuspension, signalled through `context.active`. The incoming context
//! never repeats the service-manager credentials, so they are recovered
//! from the newest operation snapshot that has them before the instance
//! record is written back.

use std::sync::Arc;

use keb_models::{ERSContext, Instance, InstanceOperation, ServiceManagerEntry};
use keb_process::storage::{Instances, Operations, StorageError};

use super::{BrokerError, ContextUpdateHandler, UpdateDetails, UpdateResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateIntent {
    Suspension,
    Unsuspension,
    ContextUpdate,
}

pub struct UpdateEndpoint {
    instances: Arc<dyn Instances>,
    operations: Arc<dyn Operations>,
    handler: Arc<dyn ContextUpdateHandler>,
    processing_enabled: bool,
}

impl UpdateEndpoint {
    pub fn new(
        instances: Arc<dyn Instances>,
        operations: Arc<dyn Operations>,
        handler: Arc<dyn ContextUpdateHandler>,
        processing_enabled: bool,
    ) -> Self {
        Self {
            instances,
            operations,
            handler,
            processing_enabled,
        }
    }

    pub async fn update(
        &self,
        instance_id: &str,
        details: UpdateDetails,
        async_allowed: bool,
    ) -> Result<UpdateResponse, BrokerError> {
        tracing::info!(instance_id, plan_id = %details.plan_id, "processing update");

        let instance = self
            .instances
            .get_by_id(instance_id)
            .await
            .map_err(|err| match err {
                StorageError::NotFound(_) => BrokerError::InstanceNotFound(instance_id.to_string()),
                other => BrokerError::Storage(other),
            })?;

        if !self.processing_enabled {
            tracing::info!(instance_id, "update processing is disabled, ignoring");
            return Ok(UpdateResponse::default());
        }
        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }

        let incoming = parse_context(details.context.as_ref())?;
        let history = self
            .operations
            .list_operations_by_instance_id(instance_id)
            .await?;
        let intent = classify_intent(history.last(), incoming.active);
        let recovered = recover_credentials(&history, &instance);

        if recovered.is_none() && intent != UpdateIntent::ContextUpdate {
            return Err(BrokerError::MissingCredentials);
        }

        let mut updated = instance;
        if let Some(service_manager) = recovered {
            updated.parameters.ers_context.service_manager = Some(service_manager);
        }
        match intent {
            // The stored flag records the state the instance is leaving, not
            // the one it is entering; consumers rely on this inversion.
            UpdateIntent::Suspension => updated.parameters.ers_context.active = Some(true),
            UpdateIntent::Unsuspension => updated.parameters.ers_context.active = Some(false),
            UpdateIntent::ContextUpdate => {}
        }
        let stored = self.instances.update(updated).await?;

        tracing::info!(instance_id, intent = ?intent, "instance context updated");
        let operation_id = self
            .handler
            .handle(&stored, &incoming)
            .await
            .map_err(|err| BrokerError::UpdateFailed(err.to_string()))?;

        Ok(UpdateResponse {
            is_async: operation_id.is_some(),
            operation_id,
        })
    }
}

fn parse_context(raw: Option<&serde_json::Value>) -> Result<ERSContext, BrokerError> {
    match raw {
        None => Ok(ERSContext::default()),
        Some(value) if value.is_object() => {
            serde_json::from_value(value.clone()).map_err(|_| BrokerError::MalformedContext)
        }
        Some(_) => Err(BrokerError::MalformedContext),
    }
}

/// Suspension and unsuspension are recognized from the newest operation
/// together with the requested `active` value; everything else is a plain
/// context update.
fn classify_intent(last: Option<&InstanceOperation>, active: Option<bool>) -> UpdateIntent {
    match (last, active) {
        (Some(op), Some(true)) if op.is_suspension() => UpdateIntent::Unsuspension,
        (Some(op), Some(false)) if op.is_provisioning() => UpdateIntent::Suspension,
        _ => UpdateIntent::ContextUpdate,
    }
}

/// Newest snapshot with a usable basic-auth pair wins; the instance record
/// itself is the fallback when no snapshot carries one.
fn recover_credentials(
    history: &[InstanceOperation],
    instance: &Instance,
) -> Option<ServiceManagerEntry> {
    history
        .iter()
        .rev()
        .find_map(|op| {
            op.operation()
                .provisioning_parameters
                .ers_context
                .service_manager
                .as_ref()
                .filter(|sm| sm.has_credentials())
        })
        .or_else(|| {
            instance
                .parameters
                .ers_context
                .service_manager
                .as_ref()
                .filter(|sm| sm.has_credentials())
        })
        .cloned()
}
