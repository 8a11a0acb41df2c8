//! Postgres-backed storage
//!
//! Entities are kept as JSONB payloads keyed by their ids; `created_at` is
//! mirrored into a column so history queries can order in SQL. The schema
//! is bootstrapped on connect.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keb_models::{
    DeprovisioningOperation, Instance, InstanceOperation, ProvisioningOperation,
    UpgradeKymaOperation,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{Instances, Operations, StorageError};

const SCHEMA_DDL: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS keb",
    "CREATE TABLE IF NOT EXISTS keb.instances (
        instance_id text PRIMARY KEY,
        payload jsonb NOT NULL,
        created_at timestamptz NOT NULL,
        updated_at timestamptz NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS keb.operations (
        id text PRIMARY KEY,
        instance_id text NOT NULL,
        payload jsonb NOT NULL,
        created_at timestamptz NOT NULL,
        updated_at timestamptz NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS operations_instance_idx
        ON keb.operations (instance_id, created_at)",
];

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend)?;

        for ddl in SCHEMA_DDL {
            sqlx::query(ddl).execute(&pool).await.map_err(backend)?;
        }
        tracing::info!("storage schema ready");

        Ok(Self { pool })
    }

    pub fn instances(&self) -> Arc<dyn Instances> {
        Arc::new(PostgresInstances { pool: self.pool.clone() })
    }

    pub fn operations(&self) -> Arc<dyn Operations> {
        Arc::new(PostgresOperations { pool: self.pool.clone() })
    }
}

fn backend(err: sqlx::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn insert_error(err: sqlx::Error, what: String) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict(what),
        _ => backend(err),
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> Result<T, StorageError> {
    serde_json::from_value(payload).map_err(|e| StorageError::Malformed(e.to_string()))
}

struct PostgresInstances {
    pool: PgPool,
}

#[async_trait]
impl Instances for PostgresInstances {
    async fn insert(&self, instance: Instance) -> Result<(), StorageError> {
        let payload = serde_json::to_value(&instance)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        sqlx::query(
            "INSERT INTO keb.instances (instance_id, payload, created_at, updated_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&instance.instance_id)
        .bind(&payload)
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, format!("instance {}", instance.instance_id)))?;
        Ok(())
    }

    async fn get_by_id(&self, instance_id: &str) -> Result<Instance, StorageError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT payload FROM keb.instances WHERE instance_id = $1")
                .bind(instance_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        match row {
            Some((payload,)) => decode(payload),
            None => Err(StorageError::NotFound(format!("instance {instance_id}"))),
        }
    }

    async fn update(&self, mut instance: Instance) -> Result<Instance, StorageError> {
        instance.updated_at = Utc::now();
        let payload = serde_json::to_value(&instance)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE keb.instances SET payload = $2, updated_at = $3 WHERE instance_id = $1",
        )
        .bind(&instance.instance_id)
        .bind(&payload)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "instance {}",
                instance.instance_id
            )));
        }
        Ok(instance)
    }
}

struct PostgresOperations {
    pool: PgPool,
}

impl PostgresOperations {
    async fn insert_row(&self, operation: InstanceOperation) -> Result<(), StorageError> {
        let base = operation.operation();
        let payload = serde_json::to_value(&operation)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        sqlx::query(
            "INSERT INTO keb.operations (id, instance_id, payload, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&base.id)
        .bind(&base.instance_id)
        .bind(&payload)
        .bind(base.created_at)
        .bind(base.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, format!("operation {}", base.id)))?;
        Ok(())
    }
}

#[async_trait]
impl Operations for PostgresOperations {
    async fn insert_provisioning_operation(
        &self,
        operation: ProvisioningOperation,
    ) -> Result<(), StorageError> {
        self.insert_row(InstanceOperation::Provisioning(operation)).await
    }

    async fn insert_deprovisioning_operation(
        &self,
        operation: DeprovisioningOperation,
    ) -> Result<(), StorageError> {
        self.insert_row(InstanceOperation::Deprovisioning(operation)).await
    }

    async fn insert_upgrade_kyma_operation(
        &self,
        operation: UpgradeKymaOperation,
    ) -> Result<(), StorageError> {
        self.insert_row(InstanceOperation::UpgradeKyma(operation)).await
    }

    async fn get_operation_by_id(
        &self,
        operation_id: &str,
    ) -> Result<InstanceOperation, StorageError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT payload FROM keb.operations WHERE id = $1")
                .bind(operation_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        match row {
            Some((payload,)) => decode(payload),
            None => Err(StorageError::NotFound(format!("operation {operation_id}"))),
        }
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
        operation.operation.updated_at = Utc::now();
        let payload = serde_json::to_value(InstanceOperation::UpgradeKyma(operation.clone()))
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE keb.operations SET payload = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(&operation.operation.id)
        .bind(&payload)
        .bind(operation.operation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "operation {}",
                operation.operation.id
            )));
        }
        Ok(operation)
    }

    async fn list_operations_by_instance_id(
        &self,
        instance_id: &str,
    ) -> Result<Vec<InstanceOperation>, StorageError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT payload FROM keb.operations
             WHERE instance_id = $1 ORDER BY created_at ASC",
        )
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(|(payload,)| decode(payload)).collect()
    }
}
