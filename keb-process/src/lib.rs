//! KEB Process - lifecycle step pipeline for the Kyma environment broker
//!
//! This crate provides the building blocks the broker's operation queue
//! drives: the idempotent [`step::Step`] contract, concrete steps (Azure
//! event-hub teardown), the AVS evaluation-monitor manager used during
//! upgrades, the operation/instance stores, hyperscaler client seams, and
//! the provider cluster-config factory.
//!
//! The queue itself is an external collaborator: a step never sleeps, it
//! returns the delay after which it wants to be invoked again.

pub mod avs;
pub mod hyperscaler;
pub mod manager;
pub mod operation_manager;
pub mod provider;
pub mod step;
pub mod steps;
pub mod storage;

pub use manager::Manager;
pub use operation_manager::OperationManager;
pub use step::{Step, StepError, StepResult};
