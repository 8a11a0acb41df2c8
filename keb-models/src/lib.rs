//! KEB Models - domain model for the Kyma environment broker
//!
//! This crate holds the broker's persisted entities: instances, their
//! provisioning parameters (including the ERS context carried on every
//! broker request), and the lifecycle operations that drive them.

mod avs;
mod ers_context;
mod instance;
mod operation;
pub mod plans;

pub use avs::*;
pub use ers_context::*;
pub use instance::*;
pub use operation::*;
