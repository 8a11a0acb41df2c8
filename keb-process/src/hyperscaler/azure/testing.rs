//! Scripted fakes for the resource-group client, one per observable state
//! of the external API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AzureConfig, AzureError, HyperscalerProvider, ResourceGroup, ResourceGroupsClient, Tags,
    PROVISIONING_STATE_DELETING,
};

enum Mode {
    Exists,
    InDeletionMode,
    DoesNotExist,
    GetError,
    DeleteError,
    PropertiesMissing,
}

pub struct FakeResourceGroupsClient {
    mode: Mode,
    delete_called: AtomicBool,
}

impl FakeResourceGroupsClient {
    fn with_mode(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            delete_called: AtomicBool::new(false),
        })
    }

    pub fn resource_group_exists() -> Arc<Self> {
        Self::with_mode(Mode::Exists)
    }

    pub fn resource_group_in_deletion_mode() -> Arc<Self> {
        Self::with_mode(Mode::InDeletionMode)
    }

    pub fn resource_group_does_not_exist() -> Arc<Self> {
        Self::with_mode(Mode::DoesNotExist)
    }

    pub fn resource_group_connection_error() -> Arc<Self> {
        Self::with_mode(Mode::GetError)
    }

    pub fn resource_group_delete_error() -> Arc<Self> {
        Self::with_mode(Mode::DeleteError)
    }

    pub fn resource_group_properties_missing() -> Arc<Self> {
        Self::with_mode(Mode::PropertiesMissing)
    }

    pub fn delete_resource_group_called(&self) -> bool {
        self.delete_called.load(Ordering::SeqCst)
    }

    fn group(&self, provisioning_state: Option<&str>) -> ResourceGroup {
        ResourceGroup {
            name: "fake-resource-group".to_string(),
            provisioning_state: provisioning_state.map(str::to_string),
        }
    }
}

#[async_trait]
impl ResourceGroupsClient for FakeResourceGroupsClient {
    async fn get_resource_group(&self, _tags: &Tags) -> Result<ResourceGroup, AzureError> {
        match self.mode {
            Mode::Exists | Mode::DeleteError => Ok(self.group(Some("Succeeded"))),
            Mode::InDeletionMode => Ok(self.group(Some(PROVISIONING_STATE_DELETING))),
            Mode::DoesNotExist => Err(AzureError::ResourceGroupNotFound),
            Mode::GetError => Err(AzureError::Api("ups ... can't get resource group".to_string())),
            Mode::PropertiesMissing => Ok(self.group(None)),
        }
    }

    async fn delete_resource_group(&self, _name: &str) -> Result<(), AzureError> {
        self.delete_called.store(true, Ordering::SeqCst);
        match self.mode {
            Mode::DeleteError => Err(AzureError::Api(
                "ups ... can't delete resource group".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

pub struct FakeHyperscalerProvider {
    client: Arc<FakeResourceGroupsClient>,
    fail: bool,
}

impl FakeHyperscalerProvider {
    pub fn new(client: Arc<FakeResourceGroupsClient>) -> Self {
        Self { client, fail: false }
    }

    /// Provider whose client construction always fails.
    pub fn erroring() -> Self {
        Self {
            client: FakeResourceGroupsClient::resource_group_exists(),
            fail: true,
        }
    }
}

impl HyperscalerProvider for FakeHyperscalerProvider {
    fn get_client(&self, _config: &AzureConfig) -> Result<Arc<dyn ResourceGroupsClient>, AzureError> {
        if self.fail {
            return Err(AzureError::Client("ups ... client cannot be created".to_string()));
        }
        Ok(self.client.clone())
    }
}
