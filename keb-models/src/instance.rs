//! Instance record and provisioning parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ers_context::ERSContext;

/// Effective provisioning parameters of an instance or operation.
///
/// Operations carry an immutable snapshot of these; the instance record
/// carries the current desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningParameters {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_id: String,
    #[serde(default)]
    pub ers_context: ERSContext,
    #[serde(default)]
    pub parameters: ProvisioningParametersDTO,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform_region: String,
}

/// Free-form plan parameters supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningParametersDTO {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Abstract region ("europe"/"us"/"asia" for trial plans, a cloud
    /// region otherwise).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
}

/// Current desired-state record of a managed runtime.
///
/// Created by the first provisioning operation and destroyed only by a
/// permanent deprovisioning; suspension keeps the record alive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub runtime_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub global_account_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_account_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_id: String,
    pub service_plan_id: String,
    #[serde(default)]
    pub parameters: ProvisioningParameters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Instance {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            instance_id: String::new(),
            runtime_id: String::new(),
            global_account_id: String::new(),
            sub_account_id: String::new(),
            service_id: String::new(),
            service_plan_id: String::new(),
            parameters: ProvisioningParameters::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_parse_broker_payload() {
        let pp: ProvisioningParameters = serde_json::from_str(
            r#"{
                "plan_id": "4deee563-e5ec-4731-b9b1-53b42d855f0c",
                "ers_context": {"subaccount_id": "sa-1"},
                "parameters": {"name": "nachtmaar-15", "components": [], "region": "westeurope"}
            }"#,
        )
        .unwrap();

        assert_eq!(pp.ers_context.sub_account_id, "sa-1");
        assert_eq!(pp.parameters.region.as_deref(), Some("westeurope"));
        assert_eq!(pp.parameters.name, "nachtmaar-15");
    }
}
