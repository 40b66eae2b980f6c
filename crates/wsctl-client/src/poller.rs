//! Status polling: wait for a session to reach a desired state.
//!
//! After a mutation is submitted the server transitions the session
//! asynchronously; the poller watches a single session until its state
//! lands in a desired set. Fetches are strictly sequential: the interval
//! is measured from the previous response settling, so overlapping
//! fetches cannot happen. A wait is abandoned cooperatively through its
//! [`WaitHandle`]; there is no backoff and, unless configured, no
//! spontaneous timeout.

use crate::api::SessionApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsctl_core::{SessionName, SessionState};

/// States that resolve a wait.
#[derive(Debug, Clone)]
pub struct DesiredStates {
    states: Vec<SessionState>,
}

impl DesiredStates {
    /// Creates a desired set from explicit states.
    pub fn new(states: impl Into<Vec<SessionState>>) -> Self {
        Self {
            states: states.into(),
        }
    }

    /// Wait for a session to come up after start or resume.
    ///
    /// `starting` is included deliberately: the submitting caller only
    /// needs confirmation that the server accepted the transition.
    pub fn until_up() -> Self {
        Self::new([SessionState::Starting, SessionState::Running])
    }

    /// Wait for a pause to land.
    pub fn until_hibernated() -> Self {
        Self::new([SessionState::Hibernated])
    }

    /// Wait for a delete to complete.
    pub fn until_stopped() -> Self {
        Self::new([SessionState::Stopping])
    }

    /// Returns true if `state` resolves this wait.
    pub fn contains(&self, state: SessionState) -> bool {
        self.states.contains(&state)
    }

    /// Returns true if a vanished record resolves this wait.
    ///
    /// A delete removes the record entirely, so absence is the success
    /// signal when waiting on `stopping`. For every other wait, absence
    /// means the session is unexpectedly gone.
    pub fn accepts_absence(&self) -> bool {
        self.contains(SessionState::Stopping)
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Observed state entered the desired set
    Reached(SessionState),

    /// Record vanished while waiting on `stopping`; counts as success
    Gone,

    /// Record vanished while waiting on anything else; the session must
    /// no longer be treated as alive
    Vanished,

    /// Abandoned via [`WaitHandle::skip`] or by dropping the handle
    Cancelled,

    /// Configured give-up limit elapsed
    TimedOut,
}

// ============================================================================
// Poller
// ============================================================================

/// Watches single sessions until they reach a desired state.
pub struct StatusPoller {
    api: Arc<dyn SessionApi>,
    interval: Duration,
    give_up_after: Option<Duration>,
}

impl StatusPoller {
    /// Delay between a response settling and the next fetch.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

    /// Creates a poller with the default interval and no give-up limit.
    pub fn new(api: Arc<dyn SessionApi>) -> Self {
        Self {
            api,
            interval: Self::DEFAULT_INTERVAL,
            give_up_after: None,
        }
    }

    /// Overrides the fetch interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bounds how long a wait may run before resolving
    /// [`WaitOutcome::TimedOut`]. Without this a wait is bounded only by
    /// its handle's lifetime.
    pub fn with_give_up_after(mut self, limit: Duration) -> Self {
        self.give_up_after = Some(limit);
        self
    }

    /// Starts watching `name` until its state is in `desired`.
    ///
    /// The first fetch is issued immediately. The returned handle
    /// cancels the wait when dropped.
    pub fn start_waiting(&self, name: SessionName, desired: DesiredStates) -> WaitHandle {
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let task = PollTask {
            api: Arc::clone(&self.api),
            name,
            desired,
            interval: self.interval,
            deadline: self.give_up_after.map(|limit| Instant::now() + limit),
            cancel: cancel.clone(),
            outcome_tx,
        };
        tokio::spawn(task.run());

        WaitHandle { outcome_rx, cancel }
    }
}

struct PollTask {
    api: Arc<dyn SessionApi>,
    name: SessionName,
    desired: DesiredStates,
    interval: Duration,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    outcome_tx: watch::Sender<Option<WaitOutcome>>,
}

impl PollTask {
    async fn run(self) {
        let outcome = self.poll_until_settled().await;
        debug!(session = %self.name, ?outcome, "Wait settled");
        let _ = self.outcome_tx.send(Some(outcome));
    }

    async fn poll_until_settled(&self) -> WaitOutcome {
        loop {
            if self.cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return WaitOutcome::TimedOut;
            }

            // Cancellation preempts an in-flight fetch; its result is
            // discarded.
            let fetched = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return WaitOutcome::Cancelled,
                result = self.api.get_session(&self.name) => result,
            };

            match fetched {
                Ok(Some(session)) if self.desired.contains(session.state()) => {
                    return WaitOutcome::Reached(session.state());
                }
                Ok(Some(session)) => {
                    debug!(
                        session = %self.name,
                        state = %session.state(),
                        "Not yet in desired state"
                    );
                }
                Ok(None) if self.desired.accepts_absence() => return WaitOutcome::Gone,
                Ok(None) => return WaitOutcome::Vanished,
                Err(error) => {
                    // Transient; the next tick fires regardless
                    debug!(session = %self.name, %error, "Status fetch failed, still waiting");
                }
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return WaitOutcome::Cancelled,
                _ = sleep(self.interval) => {}
            }
        }
    }
}

// ============================================================================
// Wait Handle
// ============================================================================

/// Caller's view of one running wait.
///
/// Dropping the handle cancels the wait; the poll task stops fetching
/// and publishes [`WaitOutcome::Cancelled`].
#[derive(Debug)]
pub struct WaitHandle {
    outcome_rx: watch::Receiver<Option<WaitOutcome>>,
    cancel: CancellationToken,
}

impl WaitHandle {
    /// Returns true while the wait is unresolved.
    ///
    /// Flips to false the instant [`skip`] is called, before the poll
    /// task has observed the cancellation, so callers never render a
    /// stale in-progress state.
    ///
    /// [`skip`]: WaitHandle::skip
    pub fn is_waiting(&self) -> bool {
        !self.cancel.is_cancelled() && self.outcome_rx.borrow().is_none()
    }

    /// Returns the outcome once the wait has settled.
    pub fn outcome(&self) -> Option<WaitOutcome> {
        *self.outcome_rx.borrow()
    }

    /// Abandons the wait. No further fetch is issued.
    pub fn skip(&self) {
        self.cancel.cancel();
    }

    /// Returns a receiver that observes the outcome when it settles.
    pub fn subscribe(&self) -> watch::Receiver<Option<WaitOutcome>> {
        self.outcome_rx.clone()
    }

    /// Waits for the outcome.
    pub async fn wait(&mut self) -> WaitOutcome {
        loop {
            if let Some(outcome) = *self.outcome_rx.borrow_and_update() {
                return outcome;
            }
            if self.outcome_rx.changed().await.is_err() {
                // Poll task is gone without settling; treat as abandoned
                return WaitOutcome::Cancelled;
            }
        }
    }

    /// Token shared with the poll task, for chained operations that must
    /// be able to abort the wait.
    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
