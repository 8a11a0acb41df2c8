//! Plan catalog constants
//!
//! Azure plan family only; plan ids come from the broker catalog.

pub const AZURE_PLAN_ID: &str = "4deee563-e5ec-4731-b9b1-53b42d855f0c";
pub const AZURE_LITE_PLAN_ID: &str = "8cb22518-aa26-44c5-91a0-e669ec9bf443";
pub const TRIAL_PLAN_ID: &str = "7d55d31d-35ae-4438-bf13-6ffdfa107d9f";

pub fn is_trial_plan(plan_id: &str) -> bool {
    plan_id == TRIAL_PLAN_ID
}

/// Abstract region offered to trial-plan users; providers map it to a
/// concrete cloud region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialCloudRegion {
    Europe,
    Us,
    Asia,
}

impl TrialCloudRegion {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "europe" => Some(TrialCloudRegion::Europe),
            "us" => Some(TrialCloudRegion::Us),
            "asia" => Some(TrialCloudRegion::Asia),
            _ => None,
        }
    }
}
