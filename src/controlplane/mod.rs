//! Stack control-plane integration.
//!
//! This module defines the domain types and the abstract client the
//! reconciliation engine drives, plus the CloudFormation-backed
//! implementation used in production.

mod aws;
mod client;
mod types;

pub use aws::AwsControlPlane;
pub use client::ControlPlaneClient;
pub use types::{
    DeclaredParameter, EventPage, StackDescription, StackEvent, StackPage, StackParameter,
    StackSpec, StackSummary, StackTag,
};

#[cfg(test)]
pub(crate) use client::MockControlPlaneClient;
