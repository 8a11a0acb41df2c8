//! Suspension context handler
//!
//! Reacts to `active` flips for trial instances by inserting the follow-on
//! operation: a temporary deprovisioning on suspend, a provisioning on
//! unsuspend. The step pipeline picks those operations up asynchronously.

use std::sync::Arc;

use async_trait::async_trait;
use keb_models::{
    plans, DeprovisioningOperation, ERSContext, Instance, Operation, OperationState,
    ProvisioningOperation,
};
use keb_process::storage::Operations;
use uuid::Uuid;

use super::ContextUpdateHandler;

pub struct SuspensionContextHandler {
    operations: Arc<dyn Operations>,
}

impl SuspensionContextHandler {
    pub fn new(operations: Arc<dyn Operations>) -> Self {
        Self { operations }
    }

    fn new_operation(&self, instance: &Instance) -> Operation {
        let mut operation = Operation::new(Uuid::new_v4().to_string(), &instance.instance_id);
        operation.state = Some(OperationState::InProgress);
        operation.provisioning_parameters = instance.parameters.clone();
        operation
    }
}

#[async_trait]
impl ContextUpdateHandler for SuspensionContextHandler {
    async fn handle(
        &self,
        instance: &Instance,
        context: &ERSContext,
    ) -> anyhow::Result<Option<String>> {
        if !plans::is_trial_plan(&instance.service_plan_id) {
            tracing::debug!(
                instance_id = %instance.instance_id,
                plan_id = %instance.service_plan_id,
                "not a trial plan, nothing to suspend"
            );
            return Ok(None);
        }

        let history = self
            .operations
            .list_operations_by_instance_id(&instance.instance_id)
            .await?;
        let last_is_suspension = history.last().map(|op| op.is_suspension()).unwrap_or(false);

        match context.active {
            Some(false) if !last_is_suspension => {
                let operation = DeprovisioningOperation {
                    operation: self.new_operation(instance),
                    temporary: true,
                };
                let id = operation.operation.id.clone();
                self.operations
                    .insert_deprovisioning_operation(operation)
                    .await?;
                tracing::info!(instance_id = %instance.instance_id, operation_id = %id, "suspension started");
                Ok(Some(id))
            }
            Some(true) if last_is_suspension => {
                let operation = ProvisioningOperation {
                    operation: self.new_operation(instance),
                };
                let id = operation.operation.id.clone();
                self.operations
                    .insert_provisioning_operation(operation)
                    .await?;
                tracing::info!(instance_id = %instance.instance_id, operation_id = %id, "unsuspension started");
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }
}
