//! Stack deployment engine.
//!
//! This module contains the reconciliation core: the incremental event
//! ledger, status classification, the per-operation poller, the public
//! reconciler API, and the stale-stack cleanup scanner.

mod cleanup;
mod ledger;
mod poller;
mod reconciler;
mod status;

pub use cleanup::{CleanupCandidate, CleanupOptions};
pub use ledger::{EventLedger, LedgerPull};
pub use poller::{DEFAULT_POLL_INTERVAL, EventSink, Poller, StackAction, TracingSink};
pub use reconciler::{DEFAULT_CAPABILITIES, Reconciler, ReconcilerConfig};
pub use status::{STABLE_STATUSES, STACK_RESOURCE_TYPE, StackProgress, classify, is_authoritative, is_updatable};
