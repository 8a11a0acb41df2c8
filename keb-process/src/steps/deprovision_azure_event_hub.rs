//! Azure event-hub teardown step
//!
//! All event-hub namespaces of an instance live in one tagged resource
//! group; deleting that group is the entire teardown. The step watches the
//! group through three observable states (present, deleting, absent) and
//! records completion in the operation's `event_hub.deleted` marker, which
//! also makes re-invocation a no-op.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keb_models::UpgradeKymaOperation;

use crate::hyperscaler::azure::{
    AzureConfig, AzureError, HyperscalerProvider, Tags, TAG_SUB_ACCOUNT_ID,
};
use crate::hyperscaler::{AccountProvider, HyperscalerType};
use crate::operation_manager::OperationManager;
use crate::step::{Step, StepResult};
use crate::storage::{Instances, Operations, StorageError};

/// Fixed polling interval against the ARM API; deliberately not exponential.
const RETRY_INTERVAL: Duration = Duration::from_secs(10);

pub struct DeprovisionAzureEventHubStep {
    operation_manager: OperationManager,
    instances: Arc<dyn Instances>,
    hyperscaler_provider: Arc<dyn HyperscalerProvider>,
    account_provider: Arc<dyn AccountProvider>,
}

impl DeprovisionAzureEventHubStep {
    pub fn new(
        operations: Arc<dyn Operations>,
        instances: Arc<dyn Instances>,
        hyperscaler_provider: Arc<dyn HyperscalerProvider>,
        account_provider: Arc<dyn AccountProvider>,
    ) -> Self {
        Self {
            operation_manager: OperationManager::new(operations),
            instances,
            hyperscaler_provider,
            account_provider,
        }
    }

    /// Subaccount and tenant come from the operation's parameter snapshot;
    /// the instance record is consulted only when the snapshot is blank.
    async fn resolve_accounts(
        &self,
        operation: &UpgradeKymaOperation,
    ) -> Result<(String, String), AccountsLookup> {
        let snapshot = &operation.operation.provisioning_parameters.ers_context;
        let mut sub_account = snapshot.sub_account_id.clone();
        let mut tenant = snapshot.global_account_id.clone();

        if sub_account.is_empty() {
            match self.instances.get_by_id(&operation.operation.instance_id).await {
                Ok(instance) => {
                    sub_account = instance.parameters.ers_context.sub_account_id.clone();
                    if tenant.is_empty() {
                        tenant = instance.parameters.ers_context.global_account_id.clone();
                    }
                }
                Err(StorageError::NotFound(what)) => {
                    return Err(AccountsLookup::Invalid(format!("{what} is gone")));
                }
                Err(StorageError::Malformed(what)) => {
                    return Err(AccountsLookup::Invalid(format!(
                        "instance record is malformed: {what}"
                    )));
                }
                Err(err) => return Err(AccountsLookup::Transient(err.to_string())),
            }
        }

        if sub_account.is_empty() {
            return Err(AccountsLookup::Invalid(
                "provisioning parameters carry no subaccount id".to_string(),
            ));
        }
        if tenant.is_empty() {
            tenant = sub_account.clone();
        }
        Ok((sub_account, tenant))
    }
}

enum AccountsLookup {
    Invalid(String),
    Transient(String),
}

#[async_trait]
impl Step for DeprovisionAzureEventHubStep {
    fn name(&self) -> &str {
        "deprovision_azure_event_hub"
    }

    async fn run(&self, mut operation: UpgradeKymaOperation) -> StepResult {
        if operation.operation.instance_details.event_hub.deleted {
            tracing::debug!(
                operation_id = %operation.operation.id,
                "event hub already deleted, nothing to do"
            );
            return Ok((operation, Duration::ZERO));
        }

        let (sub_account, tenant) = match self.resolve_accounts(&operation).await {
            Ok(accounts) => accounts,
            Err(AccountsLookup::Invalid(reason)) => {
                return self
                    .operation_manager
                    .operation_failed(operation, format!("invalid provisioning parameters: {reason}"))
                    .await;
            }
            Err(AccountsLookup::Transient(reason)) => {
                return self
                    .operation_manager
                    .retry_operation(operation, &reason, RETRY_INTERVAL)
                    .await;
            }
        };

        let credentials = match self
            .account_provider
            .gardener_credentials(HyperscalerType::Azure, &tenant)
            .await
        {
            Ok(credentials) => credentials,
            Err(err) => {
                // Credential vault hiccups are transient.
                return self
                    .operation_manager
                    .retry_operation(operation, &err.to_string(), RETRY_INTERVAL)
                    .await;
            }
        };

        let config = match AzureConfig::from_credentials(&credentials) {
            Ok(config) => config,
            Err(err) => {
                return self
                    .operation_manager
                    .operation_failed(operation, format!("cannot read azure config from credentials: {err}"))
                    .await;
            }
        };

        let client = match self.hyperscaler_provider.get_client(&config) {
            Ok(client) => client,
            Err(err) => {
                return self
                    .operation_manager
                    .operation_failed(operation, format!("cannot create azure client: {err}"))
                    .await;
            }
        };

        let tags: Tags = [(TAG_SUB_ACCOUNT_ID.to_string(), sub_account)].into();
        let group = match client.get_resource_group(&tags).await {
            Ok(group) => group,
            Err(AzureError::ResourceGroupNotFound) => {
                operation.operation.instance_details.event_hub.deleted = true;
                let (operation, when) = self.operation_manager.update_operation(operation).await;
                return Ok((operation, when));
            }
            Err(err) => {
                return self
                    .operation_manager
                    .retry_operation(operation, &err.to_string(), RETRY_INTERVAL)
                    .await;
            }
        };

        let Some(state) = group.provisioning_state.as_deref() else {
            // ARM returned the group without a properties object; without a
            // provisioning state the step cannot tell what is going on.
            return self
                .operation_manager
                .operation_failed(operation, "resource group properties are missing")
                .await;
        };

        if group.is_deleting() {
            tracing::debug!(
                operation_id = %operation.operation.id,
                resource_group = %group.name,
                "resource group deletion in progress"
            );
            return self
                .operation_manager
                .retry_operation(operation, "resource group is being deleted", RETRY_INTERVAL)
                .await;
        }

        tracing::info!(
            operation_id = %operation.operation.id,
            resource_group = %group.name,
            provisioning_state = state,
            "deleting resource group"
        );
        if let Err(err) = client.delete_resource_group(&group.name).await {
            return self
                .operation_manager
                .retry_operation(operation, &err.to_string(), RETRY_INTERVAL)
                .await;
        }

        // Deletion is asynchronous on the ARM side; observe it on the next tick.
        self.operation_manager
            .retry_operation(operation, "waiting for resource group deletion", RETRY_INTERVAL)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperscaler::azure::testing::{FakeHyperscalerProvider, FakeResourceGroupsClient};
    use crate::hyperscaler::{AccountProviderError, Credentials};
    use crate::storage::MemoryStorage;
    use keb_models::{Instance, Operation, OperationState};
    use std::collections::HashMap;

    const INSTANCE_ID: &str = "58f8c703-1756-48ab-9299-a847974d1fee";
    const OPERATION_ID: &str = "17f3ddba-1132-466d-a3c5-920f544d7ea6";
    const SUB_ACCOUNT_ID: &str = "12df5747-3efb-4df6-ad6f-4414bb661ce3";

    struct FakeAccountProvider {
        hyperscaler: HyperscalerType,
        fail: bool,
    }

    impl FakeAccountProvider {
        fn azure() -> Arc<Self> {
            Arc::new(Self { hyperscaler: HyperscalerType::Azure, fail: false })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { hyperscaler: HyperscalerType::Azure, fail: true })
        }

        fn wrong_hyperscaler() -> Arc<Self> {
            Arc::new(Self { hyperscaler: HyperscalerType::Aws, fail: false })
        }
    }

    #[async_trait]
    impl AccountProvider for FakeAccountProvider {
        async fn gardener_credentials(
            &self,
            _hyperscaler: HyperscalerType,
            _tenant: &str,
        ) -> Result<Credentials, AccountProviderError> {
            if self.fail {
                return Err(AccountProviderError(
                    "ups ... gardener credentials could not be retrieved".to_string(),
                ));
            }
            let mut data = HashMap::new();
            for key in ["subscriptionID", "clientID", "clientSecret", "tenantID"] {
                data.insert(key.to_string(), key.as_bytes().to_vec());
            }
            Ok(Credentials {
                hyperscaler_type: self.hyperscaler,
                credential_data: data,
            })
        }
    }

    fn fix_operation_with_parameters() -> UpgradeKymaOperation {
        let mut operation = Operation::new(OPERATION_ID, INSTANCE_ID);
        operation.provisioning_parameters.ers_context.sub_account_id = SUB_ACCOUNT_ID.to_string();
        UpgradeKymaOperation { operation }
    }

    fn fix_operation_without_parameters() -> UpgradeKymaOperation {
        UpgradeKymaOperation {
            operation: Operation::new(OPERATION_ID, INSTANCE_ID),
        }
    }

    fn fix_operation_with_deleted_event_hub() -> UpgradeKymaOperation {
        let mut operation = Operation::new(OPERATION_ID, INSTANCE_ID);
        operation.instance_details.event_hub.deleted = true;
        UpgradeKymaOperation { operation }
    }

    fn fix_instance() -> Instance {
        let mut instance = Instance {
            instance_id: INSTANCE_ID.to_string(),
            service_plan_id: keb_models::plans::AZURE_PLAN_ID.to_string(),
            ..Default::default()
        };
        instance.parameters.ers_context.sub_account_id = SUB_ACCOUNT_ID.to_string();
        instance.parameters.parameters.name = "nachtmaar-15".to_string();
        instance.parameters.parameters.region = Some("westeurope".to_string());
        instance
    }

    fn fix_invalid_instance() -> Instance {
        Instance {
            instance_id: INSTANCE_ID.to_string(),
            ..Default::default()
        }
    }

    struct Fixture {
        storage: MemoryStorage,
        account_provider: Arc<FakeAccountProvider>,
    }

    impl Fixture {
        async fn new(
            operation: UpgradeKymaOperation,
            instance: Instance,
            account_provider: Arc<FakeAccountProvider>,
        ) -> Self {
            let storage = MemoryStorage::new();
            storage
                .operations()
                .insert_upgrade_kyma_operation(operation)
                .await
                .unwrap();
            storage.instances().insert(instance).await.unwrap();
            Self { storage, account_provider }
        }

        fn step(&self, client: Arc<FakeResourceGroupsClient>) -> DeprovisionAzureEventHubStep {
            DeprovisionAzureEventHubStep::new(
                self.storage.operations(),
                self.storage.instances(),
                Arc::new(FakeHyperscalerProvider::new(client)),
                self.account_provider.clone(),
            )
        }

        fn erroring_provider_step(&self) -> DeprovisionAzureEventHubStep {
            DeprovisionAzureEventHubStep::new(
                self.storage.operations(),
                self.storage.instances(),
                Arc::new(FakeHyperscalerProvider::erroring()),
                self.account_provider.clone(),
            )
        }

        async fn stored_operation(&self) -> UpgradeKymaOperation {
            self.storage
                .operations()
                .get_upgrade_kyma_operation_by_id(OPERATION_ID)
                .await
                .unwrap()
        }
    }

    fn ensure_repeated(result: &StepResult) {
        let (operation, when) = result.as_ref().expect("transient condition must not error");
        assert!(!when.is_zero());
        assert_ne!(operation.operation.state, Some(OperationState::Succeeded));
    }

    fn ensure_successful(result: &StepResult) {
        let (operation, when) = result.as_ref().expect("step must succeed");
        assert!(when.is_zero());
        // Terminal success is left to a later step; the state stays unset.
        assert_eq!(operation.operation.state, None);
    }

    #[tokio::test]
    async fn test_resource_group_in_deletion_mode() {
        // Group exists -> delete issued; in deletion -> no second delete;
        // gone -> success.
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let exists = FakeResourceGroupsClient::resource_group_exists();
        let result = fixture.step(exists.clone()).run(fixture.stored_operation().await).await;
        ensure_repeated(&result);
        assert!(exists.delete_resource_group_called());

        let deleting = FakeResourceGroupsClient::resource_group_in_deletion_mode();
        let result = fixture.step(deleting.clone()).run(result.unwrap().0).await;
        ensure_repeated(&result);
        assert!(!deleting.delete_resource_group_called());

        let absent = FakeResourceGroupsClient::resource_group_does_not_exist();
        let result = fixture.step(absent).run(result.unwrap().0).await;
        ensure_successful(&result);
        assert!(result.unwrap().0.operation.instance_details.event_hub.deleted);
    }

    #[tokio::test]
    async fn test_resource_group_deleted_between_invocations() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let exists = FakeResourceGroupsClient::resource_group_exists();
        let result = fixture.step(exists).run(fixture.stored_operation().await).await;
        ensure_repeated(&result);

        let absent = FakeResourceGroupsClient::resource_group_does_not_exist();
        let result = fixture.step(absent).run(result.unwrap().0).await;
        ensure_successful(&result);
    }

    #[tokio::test]
    async fn test_resource_group_does_not_exist() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let absent = FakeResourceGroupsClient::resource_group_does_not_exist();
        let result = fixture.step(absent).run(fixture.stored_operation().await).await;

        ensure_successful(&result);
        let stored = fixture.stored_operation().await;
        assert!(stored.operation.instance_details.event_hub.deleted);
    }

    #[tokio::test]
    async fn test_event_hub_already_deleted_short_circuits() {
        let fixture = Fixture::new(
            fix_operation_with_deleted_event_hub(),
            fix_invalid_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let client = FakeResourceGroupsClient::resource_group_exists();
        let result = fixture.step(client.clone()).run(fixture.stored_operation().await).await;

        ensure_successful(&result);
        assert!(result.unwrap().0.operation.instance_details.event_hub.deleted);
        assert!(!client.delete_resource_group_called());
    }

    #[tokio::test]
    async fn test_missing_parameters_fail_permanently() {
        let fixture = Fixture::new(
            fix_operation_without_parameters(),
            fix_invalid_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let client = FakeResourceGroupsClient::resource_group_exists();
        let result = fixture.step(client).run(fixture.stored_operation().await).await;

        assert!(result.is_err());
        let stored = fixture.stored_operation().await;
        assert_eq!(stored.operation.state, Some(OperationState::Failed));
    }

    #[tokio::test]
    async fn test_credentials_provider_error_is_transient() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::failing(),
        )
        .await;

        let client = FakeResourceGroupsClient::resource_group_exists();
        let result = fixture.step(client).run(fixture.stored_operation().await).await;

        ensure_repeated(&result);
        let stored = fixture.stored_operation().await;
        assert_ne!(stored.operation.state, Some(OperationState::Failed));
    }

    #[tokio::test]
    async fn test_wrong_hyperscaler_credentials_fail_permanently() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::wrong_hyperscaler(),
        )
        .await;

        let client = FakeResourceGroupsClient::resource_group_exists();
        let result = fixture.step(client).run(fixture.stored_operation().await).await;

        assert!(result.is_err());
        let stored = fixture.stored_operation().await;
        assert_eq!(stored.operation.state, Some(OperationState::Failed));
    }

    #[tokio::test]
    async fn test_client_construction_error_fails_permanently() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let result = fixture
            .erroring_provider_step()
            .run(fixture.stored_operation().await)
            .await;

        assert!(result.is_err());
        let stored = fixture.stored_operation().await;
        assert_eq!(stored.operation.state, Some(OperationState::Failed));
    }

    #[tokio::test]
    async fn test_get_resource_group_error_is_transient() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let client = FakeResourceGroupsClient::resource_group_connection_error();
        let result = fixture.step(client).run(fixture.stored_operation().await).await;

        ensure_repeated(&result);
    }

    #[tokio::test]
    async fn test_delete_resource_group_error_is_transient() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let client = FakeResourceGroupsClient::resource_group_delete_error();
        let result = fixture.step(client.clone()).run(fixture.stored_operation().await).await;

        ensure_repeated(&result);
        assert!(client.delete_resource_group_called());
    }

    #[tokio::test]
    async fn test_missing_properties_fail_permanently() {
        let fixture = Fixture::new(
            fix_operation_with_parameters(),
            fix_instance(),
            FakeAccountProvider::azure(),
        )
        .await;

        let client = FakeResourceGroupsClient::resource_group_properties_missing();
        let result = fixture.step(client).run(fixture.stored_operation().await).await;

        assert!(result.is_err());
        let stored = fixture.stored_operation().await;
        assert_eq!(stored.operation.state, Some(OperationState::Failed));
    }
}
