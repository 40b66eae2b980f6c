//! Action surface: which actions a session currently admits, and the
//! composition of dispatcher, poller, and unsaved-work evaluation behind
//! each one.
//!
//! The legality table is a pure function of the last fetched state plus
//! the session's in-flight flag. Once a wait settles, the fetched status
//! always wins over any optimistic flag: every tracked wait clears its
//! session's flag on settle, whatever the outcome.

use crate::api::{Notifier, RepositoryProbe, SessionApi};
use crate::dispatcher::{ActionDispatcher, InFlightFlag, InFlightFlags};
use crate::error::{ClientError, Result};
use crate::poller::{DesiredStates, StatusPoller, WaitHandle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use wsctl_api::SessionCreateRequest;
use wsctl_core::{assess_unsaved_work, Session, SessionName, SessionState, UnsavedWork};

/// Server prose marking a failure as a scheduling failure, recoverable by
/// changing the resource class.
///
/// The platform reports no structured error kind, so this is a
/// compatibility shim over human-readable messages. Matching is
/// case-insensitive.
const SCHEDULING_FAILURE_MARKERS: [&str; 2] =
    ["resource quota has been exceeded", "unschedulable"];

/// Returns true when a status message indicates a scheduling failure.
pub fn is_scheduling_failure(message: Option<&str>) -> bool {
    message.is_some_and(|text| {
        let lower = text.to_ascii_lowercase();
        SCHEDULING_FAILURE_MARKERS
            .iter()
            .any(|marker| lower.contains(marker))
    })
}

// ============================================================================
// Actions
// ============================================================================

/// A user-facing session action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Connect to a running session's URL
    Open,

    /// Create a new session
    Start,

    /// Wake a hibernated session
    Resume,

    /// Hibernate a running session
    Pause,

    /// Change the resource class
    Modify,

    /// Delete the session
    Stop,

    /// Fetch container logs
    Logs,
}

impl SessionAction {
    /// Returns the menu label for this action.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Start => "Start",
            Self::Resume => "Resume",
            Self::Pause => "Pause",
            Self::Modify => "Modify",
            Self::Stop => "Delete",
            Self::Logs => "Get logs",
        }
    }

    /// Returns true for actions that risk discarding unsaved work and
    /// therefore require confirmation.
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Self::Pause | Self::Stop)
    }
}

/// Computes the ordered legal actions for a session.
///
/// `None` is the absent session (never started or already deleted). The
/// first element is the default action. An outstanding mutation freezes
/// the session entirely: no action is legal until the flag clears.
pub fn legal_actions(
    session: Option<&Session>,
    in_flight: Option<InFlightFlag>,
) -> Vec<SessionAction> {
    if in_flight.is_some() {
        return Vec::new();
    }
    let Some(session) = session else {
        return vec![SessionAction::Start];
    };

    let message = session.status.message.as_deref();
    match session.state() {
        // A session stuck on a scheduling failure may be torn down;
        // otherwise the transition just has to play out
        SessionState::Starting => {
            if is_scheduling_failure(message) {
                vec![SessionAction::Stop]
            } else {
                Vec::new()
            }
        }
        SessionState::Running => vec![
            SessionAction::Open,
            SessionAction::Pause,
            SessionAction::Stop,
            SessionAction::Logs,
        ],
        SessionState::Hibernated => vec![
            SessionAction::Resume,
            SessionAction::Modify,
            SessionAction::Stop,
        ],
        SessionState::Failed => {
            if is_scheduling_failure(message) {
                vec![SessionAction::Modify, SessionAction::Stop]
            } else {
                vec![SessionAction::Stop]
            }
        }
        SessionState::Stopping => Vec::new(),
        // Unrecognized states offer only the safe exit
        SessionState::Unknown => vec![SessionAction::Stop],
    }
}

/// Returns the default action, the most prominent entry of the set.
pub fn default_action(actions: &[SessionAction]) -> Option<SessionAction> {
    actions.first().copied()
}

// ============================================================================
// Controller
// ============================================================================

/// Drives session lifecycle operations end to end.
///
/// Each mutating operation submits through the [`ActionDispatcher`] and
/// returns a [`WaitHandle`] tracking the server-side transition. The
/// session's in-flight flag clears automatically when the wait settles.
pub struct SessionController {
    api: Arc<dyn SessionApi>,
    probe: Arc<dyn RepositoryProbe>,
    dispatcher: Arc<ActionDispatcher>,
    poller: StatusPoller,
}

impl SessionController {
    /// Creates a controller over the given collaborators.
    pub fn new(
        api: Arc<dyn SessionApi>,
        probe: Arc<dyn RepositoryProbe>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let dispatcher = Arc::new(ActionDispatcher::new(Arc::clone(&api), notifier));
        let poller = StatusPoller::new(Arc::clone(&api));
        Self {
            api,
            probe,
            dispatcher,
            poller,
        }
    }

    /// Overrides the status poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// Bounds every wait started by this controller.
    pub fn with_wait_limit(mut self, limit: Duration) -> Self {
        self.poller = self.poller.with_give_up_after(limit);
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Fetches all of the user's sessions, keyed by name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] when the query fails.
    pub async fn sessions(&self) -> Result<HashMap<String, Session>> {
        Ok(self.api.list_sessions().await?)
    }

    /// Fetches one session; `Ok(None)` when the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] when the query fails.
    pub async fn session(&self, name: &SessionName) -> Result<Option<Session>> {
        Ok(self.api.get_session(name).await?)
    }

    /// Fetches one session, treating absence as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] when the record does not
    /// exist, [`ClientError::Api`] when the query fails.
    pub async fn require_session(&self, name: &SessionName) -> Result<Session> {
        self.session(name)
            .await?
            .ok_or_else(|| ClientError::SessionNotFound { name: name.clone() })
    }

    /// Fetches recent container logs.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] when the query fails.
    pub async fn logs(&self, name: &SessionName, max_lines: Option<u32>) -> Result<String> {
        Ok(self.api.session_logs(name, max_lines).await?)
    }

    /// Evaluates unsaved-work risk for a proposed pause or delete.
    ///
    /// For running sessions this resolves the live working-tree probe
    /// first; a probe failure degrades to the fail-safe "assume unsaved"
    /// answer rather than an error.
    pub async fn unsaved_work(&self, session: &Session) -> Option<UnsavedWork> {
        let working_tree = if session.state().is_running() {
            match self.probe.working_tree(&session.name).await {
                Ok(status) => Some(status),
                Err(error) => {
                    debug!(
                        session = %session.name,
                        %error,
                        "Working-tree probe unavailable"
                    );
                    None
                }
            }
        } else {
            None
        };
        assess_unsaved_work(session, working_tree.as_ref())
    }

    /// Computes the legal actions for a session from its last fetched
    /// record and its in-flight flag.
    pub fn actions(&self, session: Option<&Session>) -> Vec<SessionAction> {
        let in_flight = session.and_then(|s| self.dispatcher.flag_for(&s.name));
        legal_actions(session, in_flight)
    }

    /// Returns a snapshot of every session's outstanding mutation.
    pub fn in_flight(&self) -> InFlightFlags {
        self.dispatcher.flags()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Creates a session and starts waiting for it to come up.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] when the create call fails; the
    /// failure has already been delivered to the notification sink.
    pub async fn launch(
        &self,
        request: &SessionCreateRequest,
    ) -> Result<(Session, WaitHandle)> {
        let session = self.dispatcher.launch(request).await?;
        let handle = self
            .poller
            .start_waiting(session.name.clone(), DesiredStates::until_up());
        Ok((session, handle))
    }

    /// Pauses a running session and starts waiting for `hibernated`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] when the patch fails; the flag is
    /// already reset.
    pub async fn pause(&self, name: &SessionName) -> Result<WaitHandle> {
        self.dispatcher.hibernate(name).await?;
        Ok(self.start_tracked_wait(name.clone(), DesiredStates::until_hibernated()))
    }

    /// Resumes a hibernated session and starts waiting for it to come up.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] when the patch fails; the flag is
    /// already reset.
    pub async fn resume(&self, name: &SessionName) -> Result<WaitHandle> {
        self.dispatcher.resume(name).await?;
        Ok(self.start_tracked_wait(name.clone(), DesiredStates::until_up()))
    }

    /// Deletes a session and starts waiting for the record to go away.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] when the delete fails; the flag
    /// is already reset.
    pub async fn stop(&self, name: &SessionName) -> Result<WaitHandle> {
        self.dispatcher.stop(name).await?;
        Ok(self.start_tracked_wait(name.clone(), DesiredStates::until_stopped()))
    }

    /// Changes a session's resource class, optionally resuming it after.
    ///
    /// Three shapes, keyed on the record passed in:
    /// - hibernated with `resume_after`: the class patch and the chained
    ///   resume run detached; the patch must resolve before the resume is
    ///   issued, and once submitted the chain always completes even if
    ///   the returned wait is abandoned. A half-applied chain would leave
    ///   the class changed but the session still paused. Chain failures
    ///   go to the notification sink and cancel the wait.
    /// - hibernated without `resume_after`: the patch response itself is
    ///   the confirmation; no wait is returned.
    /// - failed: the server re-attempts scheduling with the new class, so
    ///   the returned wait watches for the session coming up.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] when the inline patch fails. The
    /// detached chain reports failures through the notification sink
    /// instead.
    pub async fn modify(
        &self,
        session: &Session,
        resource_class_id: u32,
        resume_after: bool,
    ) -> Result<Option<WaitHandle>> {
        let name = session.name.clone();

        if resume_after && session.state().is_hibernated() {
            let handle = self.start_tracked_wait(name.clone(), DesiredStates::until_up());
            let abort = handle.cancel_token();
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                match dispatcher
                    .change_resource_class(&name, resource_class_id)
                    .await
                {
                    Ok(_) => {
                        if let Err(error) = dispatcher.resume(&name).await {
                            warn!(session = %name, %error, "Chained resume failed");
                            abort.cancel();
                        }
                    }
                    Err(error) => {
                        warn!(session = %name, %error, "Class change failed, resume skipped");
                        abort.cancel();
                    }
                }
                // While the wait is alive its settle watcher clears the
                // flag; an abandoned wait has already settled, so the
                // chain cleans up after itself
                if abort.is_cancelled() {
                    dispatcher.clear_flag(&name);
                }
            });
            return Ok(Some(handle));
        }

        self.dispatcher
            .change_resource_class(&name, resource_class_id)
            .await?;

        if session.state() == SessionState::Failed {
            Ok(Some(
                self.start_tracked_wait(name, DesiredStates::until_up()),
            ))
        } else {
            // Class-only change on a paused session settles with the
            // patch response
            self.dispatcher.clear_flag(&name);
            Ok(None)
        }
    }

    /// Starts a wait and arranges for the session's flag to clear when it
    /// settles, however it settles.
    fn start_tracked_wait(&self, name: SessionName, desired: DesiredStates) -> WaitHandle {
        let handle = self.poller.start_waiting(name.clone(), desired);
        let mut outcomes = handle.subscribe();
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            loop {
                if outcomes.borrow_and_update().is_some() {
                    break;
                }
                if outcomes.changed().await.is_err() {
                    break;
                }
            }
            dispatcher.clear_flag(&name);
        });
        handle
    }
}
