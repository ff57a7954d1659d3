//! Abstract control-plane client.
//!
//! The reconciliation engine drives the remote control plane exclusively
//! through this trait, which keeps the engine independent of the concrete
//! backend and testable against a mock.

use async_trait::async_trait;

use crate::error::Result;
use crate::template::TemplateSource;

use super::types::{DeclaredParameter, EventPage, StackDescription, StackPage, StackSpec};

/// Remote stack control plane.
///
/// All calls are network operations and may fail with a missing-stack,
/// throttling, no-changes, or generic service error; see
/// [`crate::error::ControlPlaneError`] for how each is classified.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Creates a new stack from the given spec.
    async fn create_stack(&self, spec: &StackSpec) -> Result<()>;

    /// Updates an existing stack to match the given spec.
    ///
    /// Fails with a no-changes error when the deployed stack already
    /// matches the spec.
    async fn update_stack(&self, spec: &StackSpec) -> Result<()>;

    /// Deletes the named stack.
    async fn delete_stack(&self, name: &str, client_token: &str) -> Result<()>;

    /// Describes the named stack's current status and outputs.
    async fn describe_stack(&self, name: &str) -> Result<StackDescription>;

    /// Fetches one page of the stack's event log, newest first.
    async fn list_events_page(
        &self,
        name: &str,
        page_token: Option<String>,
    ) -> Result<EventPage>;

    /// Fetches one page of the account's stack listing, restricted to the
    /// given status codes.
    async fn list_stacks_page(
        &self,
        page_token: Option<String>,
        status_filter: &[String],
    ) -> Result<StackPage>;

    /// Returns the parameter set declared by the given template.
    async fn declared_parameters(
        &self,
        template: &TemplateSource,
    ) -> Result<Vec<DeclaredParameter>>;

    /// Asks the control plane to validate the given template.
    async fn validate_template(&self, template: &TemplateSource) -> Result<()>;
}
