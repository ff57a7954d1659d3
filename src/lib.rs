// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Formation
//!
//! A declarative AWS CloudFormation stack deployment and reconciliation tool.
//!
//! ## Overview
//!
//! Formation drives a named stack to the state described by a template and
//! reports progress synchronously:
//!
//! - Deploy a template, creating the stack or updating it in place
//! - Stream the stack's event log while the operation is in flight
//! - Resolve or fail based on the stack's own terminal lifecycle event
//! - Bulk-clean stale stacks by name pattern and age
//!
//! ## Architecture
//!
//! The engine polls the control plane's append-only event log until the
//! tracked operation terminates:
//!
//! 1. **Reconciler** issues the mutation (create, update, or delete)
//! 2. **Poller** ticks on an interval, pulling new events
//! 3. **EventLedger** deduplicates the paginated, newest-first feed
//! 4. The stack's own terminal event resolves the operation
//!
//! Nested child stacks emit the same status vocabulary; only an event whose
//! logical id equals the stack name may end the operation.
//!
//! ## Modules
//!
//! - [`controlplane`]: Control-plane types, client trait, CloudFormation backend
//! - [`template`]: Template reference resolution
//! - [`deploy`]: Event ledger, status classification, poller, reconciler, cleanup
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use formation::controlplane::AwsControlPlane;
//! use formation::deploy::Reconciler;
//! use formation::template::{DefaultTemplateResolver, TemplateInput};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> formation::error::Result<()> {
//! let client = Arc::new(AwsControlPlane::from_env(None).await);
//! let resolver = Arc::new(DefaultTemplateResolver::new());
//! let reconciler = Reconciler::new(client, resolver);
//!
//! reconciler
//!     .deploy(
//!         "demo",
//!         TemplateInput::Path("stack.yaml".into()),
//!         &BTreeMap::new(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod controlplane;
pub mod deploy;
pub mod error;
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, ConsoleSink, OutputFormatter};
pub use controlplane::{AwsControlPlane, ControlPlaneClient, StackEvent, StackSpec};
pub use deploy::{
    CleanupCandidate, CleanupOptions, EventLedger, EventSink, Poller, Reconciler,
    ReconcilerConfig, StackAction,
};
pub use error::{FormationError, Result};
pub use template::{DefaultTemplateResolver, TemplateInput, TemplateResolver, TemplateSource};
