//! Incremental stack event feed.
//!
//! The control plane exposes a stack's history as a paginated, newest-first
//! event log that only ever grows. The ledger turns that into an
//! incremental feed: each pull returns only events not surfaced before, in
//! causal (ascending timestamp) order.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::controlplane::{ControlPlaneClient, EventPage, StackEvent};
use crate::error::Result;

/// Outcome of one ledger pull.
#[derive(Debug)]
pub enum LedgerPull {
    /// Events not surfaced before, ascending by timestamp. Empty when
    /// nothing new happened or the control plane throttled the tick.
    Events(Vec<StackEvent>),
    /// The stack no longer exists. Terminal success for a delete.
    StackGone,
}

/// Deduplicating reader over one stack's event log.
///
/// Owned by a single poller for the lifetime of one operation; the set of
/// surfaced event ids is discarded with it.
pub struct EventLedger {
    /// Control plane to read from.
    client: Arc<dyn ControlPlaneClient>,
    /// Stack whose events are read.
    stack_name: String,
    /// Cutoff separating this operation's events from prior history.
    started_at: DateTime<Utc>,
    /// Ids already surfaced to the caller.
    seen: HashSet<String>,
}

impl EventLedger {
    /// Creates a ledger for one operation on the given stack.
    #[must_use]
    pub fn new(
        client: Arc<dyn ControlPlaneClient>,
        stack_name: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            stack_name: stack_name.into(),
            started_at,
            seen: HashSet::new(),
        }
    }

    /// Pulls events that have not been surfaced before.
    ///
    /// Pages newest to oldest and stops requesting further pages as soon as
    /// a page contains an event older than the operation start; everything
    /// past that point belongs to prior operations. This bounds the cost of
    /// a pull as the stack's history grows.
    ///
    /// Throttling yields an empty batch for this tick. A missing stack is
    /// reported as [`LedgerPull::StackGone`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error for any other control-plane failure.
    pub async fn pull(&mut self) -> Result<LedgerPull> {
        let mut collected: Vec<StackEvent> = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = match self.client.list_events_page(&self.stack_name, token).await {
                Ok(page) => page,
                Err(err) if err.is_stack_missing() => return Ok(LedgerPull::StackGone),
                Err(err) if err.is_throttled() => {
                    debug!("Event fetch throttled for {}, skipping tick", self.stack_name);
                    return Ok(LedgerPull::Events(Vec::new()));
                }
                Err(err) => return Err(err),
            };

            let EventPage { events, next_token } = page;
            let reached_history = events
                .iter()
                .any(|event| event.timestamp < self.started_at);

            collected.extend(events);

            if reached_history {
                break;
            }
            let Some(next) = next_token else { break };
            token = Some(next);
        }

        let mut fresh: Vec<StackEvent> = collected
            .into_iter()
            .filter(|event| self.seen.insert(event.event_id.clone()))
            .collect();
        fresh.sort_by_key(|event| event.timestamp);

        debug!(
            "Pulled {} new events for {}",
            fresh.len(),
            self.stack_name
        );

        Ok(LedgerPull::Events(fresh))
    }
}
