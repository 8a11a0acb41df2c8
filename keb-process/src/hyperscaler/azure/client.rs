//! ARM REST client for resource groups

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{AzureConfig, AzureError, ResourceGroup, ResourceGroupsClient, Tags};

const MANAGEMENT_HOST: &str = "https://management.azure.com";
const LOGIN_HOST: &str = "https://login.microsoftonline.com";
const API_VERSION: &str = "2021-04-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ArmResourceGroupsClient {
    http: reqwest::Client,
    config: AzureConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ResourceGroupList {
    value: Vec<ArmResourceGroup>,
}

#[derive(Deserialize)]
struct ArmResourceGroup {
    name: String,
    properties: Option<ArmResourceGroupProperties>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmResourceGroupProperties {
    provisioning_state: Option<String>,
}

impl ArmResourceGroupsClient {
    pub fn new(config: AzureConfig) -> Result<Self, AzureError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AzureError::Client(e.to_string()))?;
        Ok(Self { http, config })
    }

    async fn access_token(&self) -> Result<String, AzureError> {
        let url = format!(
            "{LOGIN_HOST}/{}/oauth2/v2.0/token",
            self.config.tenant_id
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", "https://management.azure.com/.default"),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AzureError::Api(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AzureError::Api(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AzureError::Api(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl ResourceGroupsClient for ArmResourceGroupsClient {
    async fn get_resource_group(&self, tags: &Tags) -> Result<ResourceGroup, AzureError> {
        // ARM supports filtering on a single tag pair; the broker tags
        // every group it owns with the subaccount id.
        let (tag_name, tag_value) = tags
            .iter()
            .next()
            .ok_or_else(|| AzureError::Api("empty tag filter".to_string()))?;

        let token = self.access_token().await?;
        let url = format!(
            "{MANAGEMENT_HOST}/subscriptions/{}/resourcegroups",
            self.config.subscription_id
        );
        let filter = format!("tagName eq '{tag_name}' and tagValue eq '{tag_value}'");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("api-version", API_VERSION), ("$filter", filter.as_str())])
            .send()
            .await
            .map_err(|e| AzureError::Api(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AzureError::Api(format!(
                "listing resource groups returned {}",
                response.status()
            )));
        }

        let list: ResourceGroupList = response
            .json()
            .await
            .map_err(|e| AzureError::Api(e.to_string()))?;
        let group = list
            .value
            .into_iter()
            .next()
            .ok_or(AzureError::ResourceGroupNotFound)?;
        Ok(ResourceGroup {
            name: group.name,
            provisioning_state: group.properties.and_then(|p| p.provisioning_state),
        })
    }

    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError> {
        let token = self.access_token().await?;
        let url = format!(
            "{MANAGEMENT_HOST}/subscriptions/{}/resourcegroups/{name}",
            self.config.subscription_id
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&token)
            .query(&[("api-version", API_VERSION)])
            .send()
            .await
            .map_err(|e| AzureError::Api(e.to_string()))?;

        // 202 = deletion accepted, 404 = already gone.
        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(AzureError::Api(format!(
            "deleting resource group {name} returned {status}"
        )))
    }
}
