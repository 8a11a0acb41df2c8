//! Azure cluster-input providers, one per plan

use std::collections::HashMap;

use keb_models::plans::TrialCloudRegion;
use keb_models::ProvisioningParameters;

use super::{
    AzureProviderConfigInput, ClusterConfigInput, GardenerConfigInput, HyperscalerInputProvider,
    KymaProfile, ProviderSpecificInput,
};

pub const DEFAULT_AZURE_REGION: &str = "westeurope";

fn to_azure_region(region: TrialCloudRegion) -> &'static str {
    match region {
        TrialCloudRegion::Europe => "westeurope",
        TrialCloudRegion::Us => "eastus",
        TrialCloudRegion::Asia => "southeastasia",
    }
}

fn default_azure_zones() -> Vec<String> {
    vec!["1".to_string(), "2".to_string(), "3".to_string()]
}

fn azure_defaults(machine_type: &str) -> ClusterConfigInput {
    ClusterConfigInput {
        gardener_config: GardenerConfigInput {
            disk_type: "Standard_LRS".to_string(),
            volume_size_gb: 50,
            machine_type: machine_type.to_string(),
            region: DEFAULT_AZURE_REGION.to_string(),
            provider: "azure".to_string(),
            worker_cidr: "10.250.0.0/19".to_string(),
            auto_scaler_min: 0,
            auto_scaler_max: 0,
            max_surge: 0,
            max_unavailable: 0,
            purpose: None,
            provider_specific_config: ProviderSpecificInput {
                azure_config: Some(AzureProviderConfigInput {
                    vnet_cidr: "10.250.0.0/19".to_string(),
                    zones: default_azure_zones(),
                }),
            },
        },
    }
}

fn apply_zones(input: &mut ClusterConfigInput, zones: &Option<Vec<String>>) {
    if let (Some(zones), Some(azure)) = (
        zones,
        input.gardener_config.provider_specific_config.azure_config.as_mut(),
    ) {
        if !zones.is_empty() {
            azure.zones = zones.clone();
        }
    }
}

pub struct AzureInput;

impl HyperscalerInputProvider for AzureInput {
    fn defaults(&self) -> ClusterConfigInput {
        let mut input = azure_defaults("Standard_D8_v3");
        input.gardener_config.auto_scaler_min = 2;
        input.gardener_config.auto_scaler_max = 10;
        input.gardener_config.max_surge = 4;
        input.gardener_config.max_unavailable = 0;
        input
    }

    fn apply_parameters(
        &self,
        input: &mut ClusterConfigInput,
        parameters: &ProvisioningParameters,
    ) {
        apply_zones(input, &parameters.parameters.zones);
    }

    fn profile(&self) -> KymaProfile {
        KymaProfile::Production
    }
}

pub struct AzureLiteInput;

impl HyperscalerInputProvider for AzureLiteInput {
    fn defaults(&self) -> ClusterConfigInput {
        let mut input = azure_defaults("Standard_D4_v3");
        input.gardener_config.auto_scaler_min = 3;
        input.gardener_config.auto_scaler_max = 4;
        input.gardener_config.max_surge = 4;
        input.gardener_config.max_unavailable = 1;
        input
    }

    fn apply_parameters(
        &self,
        input: &mut ClusterConfigInput,
        parameters: &ProvisioningParameters,
    ) {
        apply_zones(input, &parameters.parameters.zones);
    }

    fn profile(&self) -> KymaProfile {
        KymaProfile::Evaluation
    }
}

/// Trial clusters are pinned to one node and an evaluation purpose; the
/// region is derived from the caller's platform region unless an explicit
/// abstract region is supplied.
pub struct AzureTrialInput {
    pub platform_region_mapping: HashMap<String, TrialCloudRegion>,
}

impl HyperscalerInputProvider for AzureTrialInput {
    fn defaults(&self) -> ClusterConfigInput {
        let mut input = azure_defaults("Standard_D4_v3");
        input.gardener_config.auto_scaler_min = 1;
        input.gardener_config.auto_scaler_max = 1;
        input.gardener_config.max_surge = 1;
        input.gardener_config.max_unavailable = 1;
        input.gardener_config.purpose = Some("evaluation".to_string());
        input
    }

    fn apply_parameters(
        &self,
        input: &mut ClusterConfigInput,
        parameters: &ProvisioningParameters,
    ) {
        if !parameters.platform_region.is_empty() {
            if let Some(region) = self.platform_region_mapping.get(&parameters.platform_region) {
                input.gardener_config.region = to_azure_region(*region).to_string();
            }
        }

        // An explicit abstract region wins over the platform mapping.
        if let Some(region) = parameters
            .parameters
            .region
            .as_deref()
            .and_then(TrialCloudRegion::parse)
        {
            input.gardener_config.region = to_azure_region(region).to_string();
        }

        apply_zones(input, &parameters.parameters.zones);
    }

    fn profile(&self) -> KymaProfile {
        KymaProfile::Evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_parameters() -> ProvisioningParameters {
        ProvisioningParameters::default()
    }

    #[test]
    fn test_azure_defaults() {
        let input = AzureInput.defaults();
        let gardener = &input.gardener_config;

        assert_eq!(gardener.machine_type, "Standard_D8_v3");
        assert_eq!(gardener.disk_type, "Standard_LRS");
        assert_eq!(gardener.volume_size_gb, 50);
        assert_eq!(gardener.region, DEFAULT_AZURE_REGION);
        assert_eq!(gardener.provider, "azure");
        assert_eq!(gardener.worker_cidr, "10.250.0.0/19");
        assert_eq!((gardener.auto_scaler_min, gardener.auto_scaler_max), (2, 10));
        assert_eq!((gardener.max_surge, gardener.max_unavailable), (4, 0));
        assert_eq!(gardener.purpose, None);

        let azure = gardener.provider_specific_config.azure_config.as_ref().unwrap();
        assert_eq!(azure.vnet_cidr, "10.250.0.0/19");
        assert_eq!(azure.zones, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_azure_lite_defaults() {
        let input = AzureLiteInput.defaults();
        let gardener = &input.gardener_config;

        assert_eq!(gardener.machine_type, "Standard_D4_v3");
        assert_eq!((gardener.auto_scaler_min, gardener.auto_scaler_max), (3, 4));
        assert_eq!((gardener.max_surge, gardener.max_unavailable), (4, 1));
        assert_eq!(gardener.purpose, None);
    }

    #[test]
    fn test_trial_defaults_pin_a_single_node() {
        let provider = AzureTrialInput { platform_region_mapping: HashMap::new() };
        let input = provider.defaults();
        let gardener = &input.gardener_config;

        assert_eq!(gardener.machine_type, "Standard_D4_v3");
        assert_eq!((gardener.auto_scaler_min, gardener.auto_scaler_max), (1, 1));
        assert_eq!((gardener.max_surge, gardener.max_unavailable), (1, 1));
        assert_eq!(gardener.purpose.as_deref(), Some("evaluation"));
    }

    #[test]
    fn test_zones_override() {
        let mut input = AzureInput.defaults();
        let mut parameters = fix_parameters();
        parameters.parameters.zones = Some(vec!["2".to_string()]);

        AzureInput.apply_parameters(&mut input, &parameters);

        let azure = input.gardener_config.provider_specific_config.azure_config.unwrap();
        assert_eq!(azure.zones, vec!["2"]);
    }

    #[test]
    fn test_trial_region_from_platform_mapping() {
        let provider = AzureTrialInput {
            platform_region_mapping: HashMap::from([(
                "cf-us10".to_string(),
                TrialCloudRegion::Us,
            )]),
        };
        let mut input = provider.defaults();
        let mut parameters = fix_parameters();
        parameters.platform_region = "cf-us10".to_string();

        provider.apply_parameters(&mut input, &parameters);

        assert_eq!(input.gardener_config.region, "eastus");
    }

    #[test]
    fn test_trial_explicit_region_wins_over_platform_mapping() {
        let provider = AzureTrialInput {
            platform_region_mapping: HashMap::from([(
                "cf-us10".to_string(),
                TrialCloudRegion::Us,
            )]),
        };
        let mut input = provider.defaults();
        let mut parameters = fix_parameters();
        parameters.platform_region = "cf-us10".to_string();
        parameters.parameters.region = Some("asia".to_string());

        provider.apply_parameters(&mut input, &parameters);

        assert_eq!(input.gardener_config.region, "southeastasia");
    }

    #[test]
    fn test_trial_unknown_regions_keep_the_default() {
        let provider = AzureTrialInput { platform_region_mapping: HashMap::new() };
        let mut input = provider.defaults();
        let mut parameters = fix_parameters();
        parameters.platform_region = "cf-unmapped".to_string();
        parameters.parameters.region = Some("mars".to_string());

        provider.apply_parameters(&mut input, &parameters);

        assert_eq!(input.gardener_config.region, DEFAULT_AZURE_REGION);
    }
}
