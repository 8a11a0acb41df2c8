//! Azure resource-group client seam
//!
//! All per-instance Azure resources live in one tagged resource group;
//! deleting that group is the sole teardown mechanism. The client trait is
//! implemented against the ARM REST API and by scripted fakes in tests.

mod client;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Credentials, HyperscalerType};

pub use client::ArmResourceGroupsClient;

/// Tag keys the broker stamps onto resource groups it owns.
pub const TAG_SUB_ACCOUNT_ID: &str = "SubAccountID";
pub const TAG_INSTANCE_ID: &str = "InstanceID";
pub const TAG_OPERATION_ID: &str = "OperationID";

/// ARM provisioning state reported while a group deletion is running.
pub const PROVISIONING_STATE_DELETING: &str = "Deleting";

pub type Tags = HashMap<String, String>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AzureError {
    #[error("resource group not found")]
    ResourceGroupNotFound,
    #[error("credentials are for hyperscaler {0}, expected azure")]
    WrongHyperscaler(HyperscalerType),
    #[error("azure credentials are missing key {0}")]
    MissingCredential(&'static str),
    #[error("building azure client: {0}")]
    Client(String),
    /// Transient API fault: timeout, throttling, 5xx.
    #[error("azure api: {0}")]
    Api(String),
}

/// Subscription-scoped service-principal configuration, extracted from the
/// account provider's credential map.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

impl AzureConfig {
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, AzureError> {
        if credentials.hyperscaler_type != HyperscalerType::Azure {
            return Err(AzureError::WrongHyperscaler(credentials.hyperscaler_type));
        }

        let field = |key: &'static str| -> Result<String, AzureError> {
            let raw = credentials
                .credential_data
                .get(key)
                .ok_or(AzureError::MissingCredential(key))?;
            let value = String::from_utf8(raw.clone())
                .map_err(|_| AzureError::MissingCredential(key))?;
            if value.is_empty() {
                return Err(AzureError::MissingCredential(key));
            }
            Ok(value)
        };

        Ok(Self {
            subscription_id: field("subscriptionID")?,
            client_id: field("clientID")?,
            client_secret: field("clientSecret")?,
            tenant_id: field("tenantID")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub name: String,
    /// None when ARM returned the group without a properties object.
    pub provisioning_state: Option<String>,
}

impl ResourceGroup {
    pub fn is_deleting(&self) -> bool {
        self.provisioning_state.as_deref() == Some(PROVISIONING_STATE_DELETING)
    }
}

#[async_trait]
pub trait ResourceGroupsClient: Send + Sync {
    /// Find the resource group carrying the given tags.
    /// `AzureError::ResourceGroupNotFound` means the group does not exist.
    async fn get_resource_group(&self, tags: &Tags) -> Result<ResourceGroup, AzureError>;

    /// Request deletion of the named group. ARM accepts the request and
    /// deletes asynchronously; an already-absent group is not an error.
    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError>;
}

/// Client factory used by steps so tests can swap in fakes per invocation.
pub trait HyperscalerProvider: Send + Sync {
    fn get_client(&self, config: &AzureConfig) -> Result<Arc<dyn ResourceGroupsClient>, AzureError>;
}

pub struct AzureHyperscalerProvider;

impl HyperscalerProvider for AzureHyperscalerProvider {
    fn get_client(&self, config: &AzureConfig) -> Result<Arc<dyn ResourceGroupsClient>, AzureError> {
        Ok(Arc::new(ArmResourceGroupsClient::new(config.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fix_credentials(hyperscaler: HyperscalerType) -> Credentials {
        let mut data = HashMap::new();
        for key in ["subscriptionID", "clientID", "clientSecret", "tenantID"] {
            data.insert(key.to_string(), key.as_bytes().to_vec());
        }
        Credentials {
            hyperscaler_type: hyperscaler,
            credential_data: data,
        }
    }

    #[test]
    fn test_config_from_azure_credentials() {
        let config = AzureConfig::from_credentials(&fix_credentials(HyperscalerType::Azure)).unwrap();
        assert_eq!(config.subscription_id, "subscriptionID");
        assert_eq!(config.tenant_id, "tenantID");
    }

    #[test]
    fn test_non_azure_credentials_are_rejected() {
        let err = AzureConfig::from_credentials(&fix_credentials(HyperscalerType::Aws)).unwrap_err();
        assert!(matches!(err, AzureError::WrongHyperscaler(HyperscalerType::Aws)));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let mut credentials = fix_credentials(HyperscalerType::Azure);
        credentials.credential_data.remove("clientSecret");
        let err = AzureConfig::from_credentials(&credentials).unwrap_err();
        assert!(matches!(err, AzureError::MissingCredential("clientSecret")));
    }

    #[test]
    fn test_deleting_state_detection() {
        let group = ResourceGroup {
            name: "rg-1".to_string(),
            provisioning_state: Some(PROVISIONING_STATE_DELETING.to_string()),
        };
        assert!(group.is_deleting());
    }
}
