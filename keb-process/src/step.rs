//! Step runner contract
//!
//! Each lifecycle step is one idempotent unit of work. The queue invokes
//! `run` with the persisted operation and interprets the result:
//!
//! - `Ok((op, Duration::ZERO))` - step complete, advance to the next step;
//! - `Ok((op, delay))` with a non-zero delay - transient condition, invoke
//!   again at `now + delay`; the operation must not be `Succeeded`;
//! - `Err(_)` - permanent failure; the step has already marked the stored
//!   operation `Failed` and the queue must not reschedule it.

use std::time::Duration;

use async_trait::async_trait;
use keb_models::UpgradeKymaOperation;

pub type StepResult = Result<(UpgradeKymaOperation, Duration), StepError>;

/// Permanent, non-reschedulable failure of a step. By the time this is
/// returned the operation has been marked `Failed` in storage.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StepError {
    pub message: String,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// Run one invocation of the step. Must be idempotent: re-invocation
    /// with the persisted output of a previous call either repeats the
    /// same effect or detects it is already present and completes.
    async fn run(&self, operation: UpgradeKymaOperation) -> StepResult;
}
