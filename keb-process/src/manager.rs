//! Weight-ordered step pipeline
//!
//! The external queue owns scheduling; this manager owns one pass over the
//! pipeline. Steps with a lower weight run first, equal weights run in
//! registration order. A non-zero duration from a step suspends the pass
//! (the queue re-enqueues), an error ends the operation for good.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use keb_models::UpgradeKymaOperation;

use crate::step::{Step, StepError};
use crate::storage::{Operations, StorageError};

const FETCH_RETRY_INTERVAL: Duration = Duration::from_secs(10);

pub struct Manager {
    operations: Arc<dyn Operations>,
    steps: BTreeMap<u32, Vec<Box<dyn Step>>>,
}

impl Manager {
    pub fn new(operations: Arc<dyn Operations>) -> Self {
        Self {
            operations,
            steps: BTreeMap::new(),
        }
    }

    pub fn add_step(&mut self, weight: u32, step: Box<dyn Step>) {
        self.steps.entry(weight).or_default().push(step);
    }

    /// Run the pipeline for one operation. Returns the delay after which
    /// the queue should call again; zero means the operation is done with
    /// this pipeline.
    pub async fn execute(&self, operation_id: &str) -> Result<Duration, StepError> {
        let mut operation = match self
            .operations
            .get_upgrade_kyma_operation_by_id(operation_id)
            .await
        {
            Ok(op) => op,
            // Backend faults are transient, everything else is fatal.
            Err(StorageError::Backend(err)) => {
                tracing::warn!(operation_id, error = %err, "cannot fetch operation, retrying");
                return Ok(FETCH_RETRY_INTERVAL);
            }
            Err(err) => return Err(StepError::new(err.to_string())),
        };

        if operation.operation.is_finished() {
            return Ok(Duration::ZERO);
        }

        for (weight, steps) in &self.steps {
            for step in steps {
                if operation.operation.is_finished() {
                    return Ok(Duration::ZERO);
                }

                tracing::info!(operation_id, weight, step = step.name(), "running step");
                let (op, when) = step.run(operation).await?;
                operation = op;

                if !when.is_zero() {
                    return Ok(when);
                }
            }
        }

        Ok(Duration::ZERO)
    }
}
