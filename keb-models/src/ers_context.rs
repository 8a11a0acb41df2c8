//! ERS context and service-manager credential types
//!
//! The ERS (Entitlements/Registration Service) context block is attached to
//! every broker request. Field names follow the broker wire format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ERSContext {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
    #[serde(rename = "subaccount_id", default, skip_serializing_if = "String::is_empty")]
    pub sub_account_id: String,
    #[serde(rename = "globalaccount_id", default, skip_serializing_if = "String::is_empty")]
    pub global_account_id: String,
    /// Service-manager credentials. Optional on the wire; when present the
    /// basic-auth pair is expected to be non-empty.
    #[serde(
        rename = "sm_platform_credentials",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub service_manager: Option<ServiceManagerEntry>,
    /// Tri-state activity flag: unset / active / suspended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceManagerEntry {
    #[serde(default)]
    pub credentials: ServiceManagerCredentials,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceManagerCredentials {
    #[serde(default)]
    pub basic_auth: ServiceManagerBasicAuth,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceManagerBasicAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ServiceManagerEntry {
    /// True when both basic-auth fields are populated.
    pub fn has_credentials(&self) -> bool {
        !self.credentials.basic_auth.username.is_empty()
            && !self.credentials.basic_auth.password.is_empty()
    }
}
