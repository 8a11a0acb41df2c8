//! Concrete lifecycle steps

mod deprovision_azure_event_hub;

pub use deprovision_azure_event_hub::DeprovisionAzureEventHubStep;
