//! Stack operation poller.
//!
//! One poller instance watches one in-flight operation: it pulls new
//! events on a fixed interval, surfaces them for observability, and
//! resolves once the stack's own lifecycle event reaches a terminal state.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::controlplane::{ControlPlaneClient, StackEvent};
use crate::error::{ControlPlaneError, DeployError, Result};

use super::ledger::{EventLedger, LedgerPull};
use super::status::{self, StackProgress};

/// Default interval between event polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The operation a poller is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAction {
    /// Stack creation.
    Create,
    /// Stack update.
    Update,
    /// Stack deletion.
    Delete,
}

impl std::fmt::Display for StackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Receiver for the ordered stream of events a poller surfaces.
pub trait EventSink: Send + Sync {
    /// Called once per new event, in ascending timestamp order.
    fn event(&self, action: StackAction, stack_name: &str, event: &StackEvent);
}

/// Default sink that logs each event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn event(&self, action: StackAction, stack_name: &str, event: &StackEvent) {
        info!(
            "{} {} {} {} {} {}",
            action,
            stack_name,
            event.resource_type,
            event.logical_id,
            event.status,
            event.status_reason.as_deref().unwrap_or_default()
        );
    }
}

/// What a single tick concluded.
enum TickOutcome {
    /// No terminal signal yet; keep polling.
    Continue,
    /// The operation finished successfully.
    Succeeded,
    /// The operation reached a terminal failure, with the remote reason
    /// when one was reported.
    Failed(Option<String>),
}

/// Watches one stack operation until it reaches a terminal state.
pub struct Poller {
    /// Incremental event feed for this operation.
    ledger: EventLedger,
    /// The operation being tracked.
    action: StackAction,
    /// Target stack name.
    stack_name: String,
    /// Cutoff separating this operation's events from prior history.
    started_at: DateTime<Utc>,
    /// Interval between ticks.
    interval: Duration,
    /// Sink receiving every surfaced event.
    sink: Arc<dyn EventSink>,
}

impl Poller {
    /// Creates a poller for one operation on the given stack.
    #[must_use]
    pub fn new(
        client: Arc<dyn ControlPlaneClient>,
        action: StackAction,
        stack_name: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let stack_name = stack_name.into();
        Self {
            ledger: EventLedger::new(client, stack_name.clone(), started_at),
            action,
            stack_name,
            started_at,
            interval: DEFAULT_POLL_INTERVAL,
            sink: Arc::new(TracingSink),
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs the poll loop until the operation terminates.
    ///
    /// Ticks never overlap: the loop is sequential, and a tick that runs
    /// long causes late timer firings to be skipped rather than queued.
    ///
    /// # Errors
    ///
    /// Returns an error when the operation reaches a terminal failure
    /// state or a control-plane call fails with something other than
    /// throttling or a missing stack.
    pub async fn run(mut self) -> Result<()> {
        debug!(
            "Polling {} of stack {} every {:?}",
            self.action, self.stack_name, self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match self.tick().await? {
                TickOutcome::Continue => {}
                TickOutcome::Succeeded => {
                    info!("Stack {} {} complete", self.stack_name, self.action);
                    return Ok(());
                }
                TickOutcome::Failed(reason) => {
                    return Err(DeployError::OperationFailed {
                        name: self.stack_name,
                        action: self.action.to_string(),
                        reason: reason
                            .unwrap_or_else(|| String::from("no reason reported")),
                    }
                    .into());
                }
            }
        }
    }

    /// Pulls new events and derives the tick outcome.
    async fn tick(&mut self) -> Result<TickOutcome> {
        let events = match self.ledger.pull().await? {
            LedgerPull::StackGone => {
                return if self.action == StackAction::Delete {
                    Ok(TickOutcome::Succeeded)
                } else {
                    Err(ControlPlaneError::stack_missing(&self.stack_name).into())
                };
            }
            LedgerPull::Events(events) => events,
        };

        let mut latest_authoritative: Option<&StackEvent> = None;
        for event in &events {
            self.sink.event(self.action, &self.stack_name, event);
            if status::is_authoritative(event, &self.stack_name) {
                latest_authoritative = Some(event);
            }
        }

        Ok(latest_authoritative.map_or(TickOutcome::Continue, |event| self.decide(event)))
    }

    /// Derives the outcome from the most recent authoritative event.
    fn decide(&self, event: &StackEvent) -> TickOutcome {
        match status::classify(&event.status) {
            StackProgress::Pending => TickOutcome::Continue,
            StackProgress::Success if event.timestamp >= self.started_at => {
                TickOutcome::Succeeded
            }
            // A stale success belongs to a prior operation; keep waiting
            // for this one's signal.
            StackProgress::Success => TickOutcome::Continue,
            StackProgress::Failure if event.timestamp >= self.started_at => {
                TickOutcome::Failed(event.status_reason.clone())
            }
            // A terminal failure that predates the operation start was left
            // behind by an earlier operation on this stack; it is not this
            // operation's failure.
            StackProgress::Failure => TickOutcome::Succeeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::{EventPage, MockControlPlaneClient};
    use crate::error::FormationError;
    use chrono::Duration as TimeDelta;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_millis(10);

    fn stack_event(
        id: &str,
        logical_id: &str,
        status: &str,
        timestamp: DateTime<Utc>,
    ) -> StackEvent {
        StackEvent {
            event_id: id.to_string(),
            logical_id: logical_id.to_string(),
            resource_type: String::from("AWS::CloudFormation::Stack"),
            status: status.to_string(),
            status_reason: None,
            timestamp,
        }
    }

    fn page(events: Vec<StackEvent>) -> EventPage {
        EventPage {
            events,
            next_token: None,
        }
    }

    #[tokio::test]
    async fn test_run_succeeds_on_authoritative_success() {
        let started_at = Utc::now();
        let mut client = MockControlPlaneClient::new();
        let scripted = page(vec![stack_event(
            "evt-1",
            "demo",
            "CREATE_COMPLETE",
            started_at + TimeDelta::seconds(5),
        )]);
        client
            .expect_list_events_page()
            .returning(move |_, _| Ok(scripted.clone()));

        let poller =
            Poller::new(Arc::new(client), StackAction::Create, "demo", started_at)
                .with_interval(INTERVAL);
        assert!(poller.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_run_fails_with_remote_reason() {
        let started_at = Utc::now();
        let mut client = MockControlPlaneClient::new();
        let mut failed = stack_event(
            "evt-1",
            "demo",
            "UPDATE_ROLLBACK_COMPLETE",
            started_at + TimeDelta::seconds(5),
        );
        failed.status_reason = Some(String::from("resource limit exceeded"));
        let scripted = page(vec![failed]);
        client
            .expect_list_events_page()
            .returning(move |_, _| Ok(scripted.clone()));

        let poller =
            Poller::new(Arc::new(client), StackAction::Update, "demo", started_at)
                .with_interval(INTERVAL);
        let err = poller.run().await.unwrap_err();
        assert!(err.to_string().contains("resource limit exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nested_child_terminal_event_keeps_running() {
        let started_at = Utc::now();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let mut client = MockControlPlaneClient::new();
        client.expect_list_events_page().returning(move |_, _| {
            let call = counted.fetch_add(1, Ordering::SeqCst);
            // The child stack completes; the parent never does.
            Ok(page(vec![stack_event(
                &format!("evt-{call}"),
                "demo-ChildStack-1ABC",
                "CREATE_COMPLETE",
                started_at + TimeDelta::seconds(5),
            )]))
        });

        let poller =
            Poller::new(Arc::new(client), StackAction::Create, "demo", started_at)
                .with_interval(INTERVAL);

        let still_running =
            tokio::time::timeout(Duration::from_secs(2), poller.run()).await;
        assert!(still_running.is_err());
        assert!(calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_delete_resolves_on_first_missing_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let mut client = MockControlPlaneClient::new();
        client.expect_list_events_page().returning(move |_, _| {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(crate::error::ControlPlaneError::stack_missing("demo").into())
        });

        let poller =
            Poller::new(Arc::new(client), StackAction::Delete, "demo", Utc::now())
                .with_interval(INTERVAL);
        assert!(poller.run().await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_stack_fails_non_delete_operations() {
        let mut client = MockControlPlaneClient::new();
        client
            .expect_list_events_page()
            .returning(|_, _| Err(crate::error::ControlPlaneError::stack_missing("demo").into()));

        let poller =
            Poller::new(Arc::new(client), StackAction::Update, "demo", Utc::now())
                .with_interval(INTERVAL);
        let err = poller.run().await.unwrap_err();
        assert!(err.is_stack_missing());
    }

    #[tokio::test]
    async fn test_pre_start_failure_counts_as_success() {
        let started_at = Utc::now();
        let mut client = MockControlPlaneClient::new();
        // A rollback left behind by a previous operation on this name.
        let scripted = page(vec![stack_event(
            "evt-1",
            "demo",
            "ROLLBACK_COMPLETE",
            started_at - TimeDelta::hours(1),
        )]);
        client
            .expect_list_events_page()
            .returning(move |_, _| Ok(scripted.clone()));

        let poller =
            Poller::new(Arc::new(client), StackAction::Create, "demo", started_at)
                .with_interval(INTERVAL);
        assert!(poller.run().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_start_success_does_not_terminate() {
        let started_at = Utc::now();
        let mut client = MockControlPlaneClient::new();
        let scripted = page(vec![stack_event(
            "evt-1",
            "demo",
            "CREATE_COMPLETE",
            started_at - TimeDelta::hours(1),
        )]);
        client
            .expect_list_events_page()
            .returning(move |_, _| Ok(scripted.clone()));

        let poller =
            Poller::new(Arc::new(client), StackAction::Update, "demo", started_at)
                .with_interval(INTERVAL);

        let still_running =
            tokio::time::timeout(Duration::from_secs(2), poller.run()).await;
        assert!(still_running.is_err());
    }

    #[tokio::test]
    async fn test_transport_error_fails_immediately() {
        let mut client = MockControlPlaneClient::new();
        client
            .expect_list_events_page()
            .returning(|_, _| Err(crate::error::ControlPlaneError::service("access denied").into()));

        let poller =
            Poller::new(Arc::new(client), StackAction::Create, "demo", Utc::now())
                .with_interval(INTERVAL);
        let err = poller.run().await.unwrap_err();
        assert!(matches!(err, FormationError::ControlPlane(_)));
    }

    #[tokio::test]
    async fn test_events_reach_sink_in_order() {
        use std::sync::Mutex;

        struct Recorder(Mutex<Vec<String>>);
        impl EventSink for Recorder {
            fn event(&self, _action: StackAction, _stack: &str, event: &StackEvent) {
                self.0.lock().unwrap().push(event.event_id.clone());
            }
        }

        let started_at = Utc::now();
        let mut client = MockControlPlaneClient::new();
        // Newest-first, as the control plane returns them.
        let scripted = page(vec![
            stack_event(
                "evt-3",
                "demo",
                "CREATE_COMPLETE",
                started_at + TimeDelta::seconds(30),
            ),
            stack_event(
                "evt-2",
                "web-server",
                "CREATE_COMPLETE",
                started_at + TimeDelta::seconds(20),
            ),
            stack_event(
                "evt-1",
                "web-server",
                "CREATE_IN_PROGRESS",
                started_at + TimeDelta::seconds(10),
            ),
        ]);
        client
            .expect_list_events_page()
            .returning(move |_, _| Ok(scripted.clone()));

        let sink = Arc::new(Recorder(Mutex::new(Vec::new())));
        let poller =
            Poller::new(Arc::new(client), StackAction::Create, "demo", started_at)
                .with_interval(INTERVAL)
                .with_sink(Arc::clone(&sink) as Arc<dyn EventSink>);

        poller.run().await.unwrap();
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec!["evt-1", "evt-2", "evt-3"]
        );
    }
}
