//! Lifecycle operations
//!
//! Operations are the durable records driven through the step pipeline.
//! Each instance has an append-only history of provisioning, deprovisioning
//! (possibly temporary, i.e. suspension) and upgrade operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::avs::AvsLifecycleData;
use crate::instance::ProvisioningParameters;

/// Broker-visible state of an operation. A fresh operation has no state yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

/// Event-hub teardown marker kept inside the instance details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHub {
    #[serde(default)]
    pub deleted: bool,
}

/// Mutable sub-state a step may persist between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDetails {
    #[serde(default)]
    pub avs: AvsLifecycleData,
    #[serde(default)]
    pub event_hub: EventHub,
}

/// Fields shared by every operation variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub instance_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// None until a step moves the operation along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<OperationState>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioner_operation_id: Option<String>,
    /// Snapshot of the parameters at operation creation time; the newest
    /// snapshot is the authoritative source for credential recovery.
    #[serde(default)]
    pub provisioning_parameters: ProvisioningParameters,
    #[serde(default)]
    pub instance_details: InstanceDetails,
}

impl Operation {
    pub fn new(id: impl Into<String>, instance_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            instance_id: instance_id.into(),
            created_at: now,
            updated_at: now,
            state: None,
            description: String::new(),
            provisioner_operation_id: None,
            provisioning_parameters: ProvisioningParameters::default(),
            instance_details: InstanceDetails::default(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            Some(OperationState::Succeeded) | Some(OperationState::Failed)
        )
    }
}

impl Default for Operation {
    fn default() -> Self {
        Operation::new("", "")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningOperation {
    #[serde(flatten)]
    pub operation: Operation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeprovisioningOperation {
    #[serde(flatten)]
    pub operation: Operation,
    /// A temporary deprovisioning is a suspension: the instance record
    /// survives and a later provisioning restores the runtime.
    #[serde(default)]
    pub temporary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeKymaOperation {
    #[serde(flatten)]
    pub operation: Operation,
}

/// Tagged union over the operation variants, as stored and as returned by
/// per-instance history queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation_type")]
pub enum InstanceOperation {
    #[serde(rename = "provision")]
    Provisioning(ProvisioningOperation),
    #[serde(rename = "deprovision")]
    Deprovisioning(DeprovisioningOperation),
    #[serde(rename = "upgrade_kyma")]
    UpgradeKyma(UpgradeKymaOperation),
}

impl InstanceOperation {
    pub fn operation(&self) -> &Operation {
        match self {
            InstanceOperation::Provisioning(op) => &op.operation,
            InstanceOperation::Deprovisioning(op) => &op.operation,
            InstanceOperation::UpgradeKyma(op) => &op.operation,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.operation().created_at
    }

    pub fn is_provisioning(&self) -> bool {
        matches!(self, InstanceOperation::Provisioning(_))
    }

    /// True for a temporary deprovisioning.
    pub fn is_suspension(&self) -> bool {
        matches!(
            self,
            InstanceOperation::Deprovisioning(DeprovisioningOperation { temporary: true, .. })
        )
    }
}
