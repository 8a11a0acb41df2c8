//! Operation and instance stores
//!
//! Trait seams over the broker storage plus two implementations: an
//! in-memory store (tests, and servers without a database) and a
//! Postgres-backed store with JSONB payloads.

mod memory;
mod postgres;

use async_trait::async_trait;
use keb_models::{
    DeprovisioningOperation, Instance, InstanceOperation, ProvisioningOperation,
    UpgradeKymaOperation,
};

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("record already exists: {0}")]
    Conflict(String),
    /// Backend faults are transient to callers; steps retry them.
    #[error("storage backend: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Instances: Send + Sync {
    async fn insert(&self, instance: Instance) -> Result<(), StorageError>;
    async fn get_by_id(&self, instance_id: &str) -> Result<Instance, StorageError>;
    async fn update(&self, instance: Instance) -> Result<Instance, StorageError>;
}

#[async_trait]
pub trait Operations: Send + Sync {
    async fn insert_provisioning_operation(
        &self,
        operation: ProvisioningOperation,
    ) -> Result<(), StorageError>;

    async fn insert_deprovisioning_operation(
        &self,
        operation: DeprovisioningOperation,
    ) -> Result<(), StorageError>;

    async fn insert_upgrade_kyma_operation(
        &self,
        operation: UpgradeKymaOperation,
    ) -> Result<(), StorageError>;

    async fn get_operation_by_id(
        &self,
        operation_id: &str,
    ) -> Result<InstanceOperation, StorageError>;

    async fn get_upgrade_kyma_operation_by_id(
        &self,
        operation_id: &str,
    ) -> Result<UpgradeKymaOperation, StorageError>;

    /// Persist a modified upgrade operation, bumping `updated_at`.
    /// Only the step that dequeued the operation may call this.
    async fn update_upgrade_kyma_operation(
        &self,
        operation: UpgradeKymaOperation,
    ) -> Result<UpgradeKymaOperation, StorageError>;

    /// Full history of one instance, oldest first by `created_at`.
    async fn list_operations_by_instance_id(
        &self,
        instance_id: &str,
    ) -> Result<Vec<InstanceOperation>, StorageError>;
}
