//! Cluster configuration factory
//!
//! Pure per-plan defaults plus user-parameter overlay, producing the
//! cluster configuration handed to the provisioner. No IO happens here.

mod azure;

pub use azure::{AzureInput, AzureLiteInput, AzureTrialInput};

use std::collections::HashMap;

use keb_models::plans::{self, TrialCloudRegion};
use keb_models::ProvisioningParameters;
use serde::{Deserialize, Serialize};

/// Cluster configuration as the provisioner consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfigInput {
    pub gardener_config: GardenerConfigInput,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GardenerConfigInput {
    pub disk_type: String,
    pub volume_size_gb: i32,
    pub machine_type: String,
    pub region: String,
    pub provider: String,
    pub worker_cidr: String,
    pub auto_scaler_min: i32,
    pub auto_scaler_max: i32,
    pub max_surge: i32,
    pub max_unavailable: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub provider_specific_config: ProviderSpecificInput,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpecificInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_config: Option<AzureProviderConfigInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureProviderConfigInput {
    pub vnet_cidr: String,
    pub zones: Vec<String>,
}

/// Kyma installation profile selected by the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KymaProfile {
    Production,
    Evaluation,
}

/// One implementation per plan; see [`input_for_plan`].
pub trait HyperscalerInputProvider: Send + Sync {
    fn defaults(&self) -> ClusterConfigInput;
    fn apply_parameters(&self, input: &mut ClusterConfigInput, parameters: &ProvisioningParameters);
    fn profile(&self) -> KymaProfile;
}

/// Resolve the input provider for a plan id. Unknown plans yield `None`
/// and the caller rejects the request.
pub fn input_for_plan(
    plan_id: &str,
    platform_region_mapping: HashMap<String, TrialCloudRegion>,
) -> Option<Box<dyn HyperscalerInputProvider>> {
    match plan_id {
        plans::AZURE_PLAN_ID => Some(Box::new(AzureInput)),
        plans::AZURE_LITE_PLAN_ID => Some(Box::new(AzureLiteInput)),
        plans::TRIAL_PLAN_ID => Some(Box::new(AzureTrialInput {
            platform_region_mapping,
        })),
        _ => None,
    }
}
