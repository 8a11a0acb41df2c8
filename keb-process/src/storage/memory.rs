//! In-memory storage
//!
//! Mutex-protected maps with the same semantics as the Postgres store.
//! Used by tests and by a server started without `DATABASE_URL`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use keb_models::{
    DeprovisioningOperation, Instance, InstanceOperation, ProvisioningOperation,
    UpgradeKymaOperation,
};

use super::{Instances, Operations, StorageError};

#[derive(Default)]
pub struct MemoryStorage {
    instances: Arc<MemoryInstances>,
    operations: Arc<MemoryOperations>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> Arc<dyn Instances> {
        self.instances.clone()
    }

    pub fn operations(&self) -> Arc<dyn Operations> {
        self.operations.clone()
    }
}

#[derive(Default)]
struct MemoryInstances {
    rows: Mutex<HashMap<String, Instance>>,
}

#[async_trait]
impl Instances for MemoryInstances {
    async fn insert(&self, instance: Instance) -> Result<(), StorageError> {
        let mut rows = self.rows.lock().expect("instances lock");
        if rows.contains_key(&instance.instance_id) {
            return Err(StorageError::Conflict(format!(
                "instance {}",
                instance.instance_id
            )));
        }
        rows.insert(instance.instance_id.clone(), instance);
        Ok(())
    }

    async fn get_by_id(&self, instance_id: &str) -> Result<Instance, StorageError> {
        let rows = self.rows.lock().expect("instances lock");
        rows.get(instance_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("instance {instance_id}")))
    }

    async fn update(&self, mut instance: Instance) -> Result<Instance, StorageError> {
        let mut rows = self.rows.lock().expect("instances lock");
        if !rows.contains_key(&instance.instance_id) {
            return Err(StorageError::NotFound(format!(
                "instance {}",
                instance.instance_id
            )));
        }
        instance.updated_at = Utc::now();
        rows.insert(instance.instance_id.clone(), instance.clone());
        Ok(instance)
    }
}

#[derive(Default)]
struct MemoryOperations {
    rows: Mutex<HashMap<String, InstanceOperation>>,
}

impl MemoryOperations {
    fn insert_row(&self, operation: InstanceOperation) -> Result<(), StorageError> {
        let id = operation.operation().id.clone();
        let mut rows = self.rows.lock().expect("operations lock");
        if rows.contains_key(&id) {
            return Err(StorageError::Conflict(format!("operation {id}")));
        }
        rows.insert(id, operation);
        Ok(())
    }
}

#[async_trait]
impl Operations for MemoryOperations {
    async fn insert_provisioning_operation(
        &self,
        operation: ProvisioningOperation,
    ) -> Result<(), StorageError> {
        self.insert_row(InstanceOperation::Provisioning(operation))
    }

    async fn insert_deprovisioning_operation(
        &self,
        operation: DeprovisioningOperation,
    ) -> Result<(), StorageError> {
        self.insert_row(InstanceOperation::Deprovisioning(operation))
    }

    async fn insert_upgrade_kyma_operation(
        &self,
        operation: UpgradeKymaOperation,
    ) -> Result<(), StorageError> {
        self.insert_row(InstanceOperation::UpgradeKyma(operation))
    }

    async fn get_operation_by_id(
        &self,
        operation_id: &str,
    ) -> Result<InstanceOperation, StorageError> {
        let rows = self.rows.lock().expect("operations lock");
        rows.get(operation_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("operation {operation_id}")))
    }

    async fn get_upgrade_kyma_operation_by_id(
        &self,
        operation_id: &str,
    ) -> Result<UpgradeKymaOperation, StorageError> {
        match self.get_operation_by_id(operation_id).await? {
            InstanceOperation::UpgradeKyma(op) => Ok(op),
            _ => Err(StorageError::NotFound(format!(
                "upgrade operation {operation_id}"
            ))),
        }
    }

    async fn update_upgrade_kyma_operation(
        &self,
        mut operation: UpgradeKymaOperation,
    ) -> Result<UpgradeKymaOperation, StorageError> {
        let mut rows = self.rows.lock().expect("operations lock");
        let id = operation.operation.id.clone();
        if !rows.contains_key(&id) {
            return Err(StorageError::NotFound(format!("operation {id}")));
        }
        operation.operation.updated_at = Utc::now();
        rows.insert(id, InstanceOperation::UpgradeKyma(operation.clone()));
        Ok(operation)
    }

    async fn list_operations_by_instance_id(
        &self,
        instance_id: &str,
    ) -> Result<Vec<InstanceOperation>, StorageError> {
        let rows = self.rows.lock().expect("operations lock");
        let mut operations: Vec<InstanceOperation> = rows
            .values()
            .filter(|op| op.operation().instance_id == instance_id)
            .cloned()
            .collect();
        operations.sort_by_key(|op| op.created_at());
        Ok(operations)
    }
}
