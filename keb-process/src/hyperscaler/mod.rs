//! Hyperscaler account seam
//!
//! The broker never talks to Gardener directly; an account provider hands
//! out per-tenant cloud credentials as an opaque key/value map.

pub mod azure;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HyperscalerType {
    Azure,
    Aws,
    Gcp,
}

impl fmt::Display for HyperscalerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HyperscalerType::Azure => "azure",
            HyperscalerType::Aws => "aws",
            HyperscalerType::Gcp => "gcp",
        };
        f.write_str(name)
    }
}

/// Credentials for one tenant on one hyperscaler.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub hyperscaler_type: HyperscalerType,
    pub credential_data: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("account provider: {0}")]
pub struct AccountProviderError(pub String);

#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Resolve the Gardener-managed credentials for `tenant` on the given
    /// hyperscaler. Failures are transient from the caller's perspective.
    async fn gardener_credentials(
        &self,
        hyperscaler: HyperscalerType,
        tenant: &str,
    ) -> Result<Credentials, AccountProviderError>;
}
