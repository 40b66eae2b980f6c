//! Mutation dispatch with per-session in-flight tracking.
//!
//! Every user intent becomes exactly one API request here. The dispatcher
//! records an optimistic flag when it submits a request so the action
//! surface can freeze the session's controls, and routes failures to the
//! notification sink under a fixed per-action title. It never retries.
//!
//! Flag lifecycle: a flag is set just before submission and survives a
//! successful response; it is the controller's job to clear it once the
//! status poller confirms the transition. A failed submission clears the
//! flag immediately so the action is offered again.
//!
//! Mutual exclusion per session is the action surface's responsibility:
//! it must not dispatch while a flag is set. The dispatcher itself does
//! not reject overlapping submissions.

use crate::api::{Notifier, SessionApi};
use crate::error::{ApiError, ClientError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use wsctl_api::{SessionCreateRequest, SessionPatch};
use wsctl_core::{Session, SessionName};

/// Notification topic for session mutation failures.
pub const NOTIFY_TOPIC: &str = "sessions";

/// Fixed notification titles, one per user-facing action.
pub const TITLE_START: &str = "Unable to start the session";
pub const TITLE_RESUME: &str = "Unable to resume the session";
pub const TITLE_PAUSE: &str = "Unable to pause the session";
pub const TITLE_MODIFY: &str = "Unable to modify the session";
pub const TITLE_DELETE: &str = "Unable to delete the session";

// ============================================================================
// In-Flight Flags
// ============================================================================

/// Which mutation is outstanding for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlightFlag {
    /// Patch to `running` submitted
    Resuming,

    /// Patch to `hibernated` submitted
    Hibernating,

    /// Resource-class patch submitted
    Modifying,

    /// Delete submitted
    Stopping,
}

impl InFlightFlag {
    /// Returns the progress label shown while the flag is set.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resuming => "resuming",
            Self::Hibernating => "pausing",
            Self::Modifying => "modifying",
            Self::Stopping => "stopping",
        }
    }
}

/// Snapshot of every session's outstanding mutation.
#[derive(Debug, Clone, Default)]
pub struct InFlightFlags {
    flags: HashMap<SessionName, InFlightFlag>,
}

impl InFlightFlags {
    /// Returns the outstanding mutation for `name`, if any.
    pub fn flag_for(&self, name: &SessionName) -> Option<InFlightFlag> {
        self.flags.get(name).copied()
    }

    /// Returns true while a mutation is outstanding for `name`.
    pub fn is_busy(&self, name: &SessionName) -> bool {
        self.flags.contains_key(name)
    }

    /// Returns true when no session has an outstanding mutation.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Issues session mutations and tracks their optimistic status.
pub struct ActionDispatcher {
    api: Arc<dyn SessionApi>,
    notifier: Arc<dyn Notifier>,
    flags_tx: watch::Sender<InFlightFlags>,
}

impl ActionDispatcher {
    /// Creates a dispatcher over the given API and notification sink.
    pub fn new(api: Arc<dyn SessionApi>, notifier: Arc<dyn Notifier>) -> Self {
        let (flags_tx, _) = watch::channel(InFlightFlags::default());
        Self {
            api,
            notifier,
            flags_tx,
        }
    }

    /// Returns a receiver that observes every flag change.
    pub fn subscribe(&self) -> watch::Receiver<InFlightFlags> {
        self.flags_tx.subscribe()
    }

    /// Returns a snapshot of all outstanding flags.
    pub fn flags(&self) -> InFlightFlags {
        self.flags_tx.borrow().clone()
    }

    /// Returns the outstanding mutation for `name`, if any.
    pub fn flag_for(&self, name: &SessionName) -> Option<InFlightFlag> {
        self.flags_tx.borrow().flag_for(name)
    }

    fn set_flag(&self, name: &SessionName, flag: InFlightFlag) {
        debug!(session = %name, flag = flag.label(), "Mutation submitted");
        self.flags_tx.send_modify(|flags| {
            flags.flags.insert(name.clone(), flag);
        });
    }

    /// Clears the outstanding flag for `name`.
    ///
    /// Called by the controller once the status poller confirms the
    /// transition (or the wait is abandoned).
    pub(crate) fn clear_flag(&self, name: &SessionName) {
        self.flags_tx.send_modify(|flags| {
            flags.flags.remove(name);
        });
    }

    /// Creates a session. The caller then waits for `{starting, running}`.
    ///
    /// No flag is recorded: the session does not exist until the server
    /// answers, so there is nothing to freeze.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] with [`TITLE_START`]; the failure
    /// has already been delivered to the notification sink.
    pub async fn launch(&self, request: &SessionCreateRequest) -> Result<Session> {
        info!(
            project = %request.project,
            branch = %request.branch,
            "Launching session"
        );
        match self.api.create_session(request).await {
            Ok(session) => Ok(session),
            Err(error) => Err(self.report(None, TITLE_START, error)),
        }
    }

    /// Patches a hibernated session back to `running`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] with [`TITLE_RESUME`]; the flag is
    /// reset and the failure delivered to the notification sink.
    pub async fn resume(&self, name: &SessionName) -> Result<Session> {
        self.set_flag(name, InFlightFlag::Resuming);
        match self.api.patch_session(name, &SessionPatch::resume()).await {
            Ok(session) => Ok(session),
            Err(error) => Err(self.report(Some(name), TITLE_RESUME, error)),
        }
    }

    /// Patches a running session to `hibernated`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] with [`TITLE_PAUSE`]; the flag is
    /// reset and the failure delivered to the notification sink.
    pub async fn hibernate(&self, name: &SessionName) -> Result<Session> {
        self.set_flag(name, InFlightFlag::Hibernating);
        match self.api.patch_session(name, &SessionPatch::hibernate()).await {
            Ok(session) => Ok(session),
            Err(error) => Err(self.report(Some(name), TITLE_PAUSE, error)),
        }
    }

    /// Patches a session's resource class without touching its state.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] with [`TITLE_MODIFY`]; the flag is
    /// reset and the failure delivered to the notification sink.
    pub async fn change_resource_class(
        &self,
        name: &SessionName,
        resource_class_id: u32,
    ) -> Result<Session> {
        self.set_flag(name, InFlightFlag::Modifying);
        let patch = SessionPatch::change_class(resource_class_id);
        match self.api.patch_session(name, &patch).await {
            Ok(session) => Ok(session),
            Err(error) => Err(self.report(Some(name), TITLE_MODIFY, error)),
        }
    }

    /// Deletes a session. The caller then waits for `stopping`, resolved
    /// by the record's disappearance.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Mutation`] with [`TITLE_DELETE`]; the flag is
    /// reset and the failure delivered to the notification sink.
    pub async fn stop(&self, name: &SessionName) -> Result<()> {
        self.set_flag(name, InFlightFlag::Stopping);
        info!(session = %name, "Deleting session");
        match self.api.delete_session(name).await {
            Ok(()) => Ok(()),
            Err(error) => Err(self.report(Some(name), TITLE_DELETE, error)),
        }
    }

    /// Resets the flag, notifies, and wraps the failure.
    ///
    /// Flag reset comes first so the action surface re-offers the action
    /// by the time the notification lands.
    fn report(
        &self,
        name: Option<&SessionName>,
        title: &'static str,
        source: ApiError,
    ) -> ClientError {
        if let Some(name) = name {
            self.clear_flag(name);
        }
        let detail = match &source {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        };
        self.notifier.notify(NOTIFY_TOPIC, title, &detail);
        ClientError::Mutation { title, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use wsctl_core::{SessionResources, SessionState, SessionStatus};

    /// Stub API: succeeds or fails every mutation wholesale.
    struct StubApi {
        fail_with: Option<ApiError>,
    }

    impl StubApi {
        fn ok() -> Arc<Self> {
            Arc::new(Self { fail_with: None })
        }

        fn failing(error: ApiError) -> Arc<Self> {
            Arc::new(Self {
                fail_with: Some(error),
            })
        }

        fn make_session(name: &SessionName, state: SessionState) -> Session {
            Session {
                name: name.clone(),
                status: SessionStatus::from_state(state),
                annotations: Default::default(),
                resources: SessionResources::default(),
                started: Utc::now(),
                image: String::new(),
                url: String::new(),
            }
        }
    }

    #[async_trait]
    impl SessionApi for StubApi {
        async fn list_sessions(&self) -> std::result::Result<HashMap<String, Session>, ApiError> {
            Ok(HashMap::new())
        }

        async fn get_session(
            &self,
            _name: &SessionName,
        ) -> std::result::Result<Option<Session>, ApiError> {
            Ok(None)
        }

        async fn create_session(
            &self,
            request: &SessionCreateRequest,
        ) -> std::result::Result<Session, ApiError> {
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(Self::make_session(
                    &SessionName::new(format!("{}-session", request.project)),
                    SessionState::Starting,
                )),
            }
        }

        async fn patch_session(
            &self,
            name: &SessionName,
            patch: &SessionPatch,
        ) -> std::result::Result<Session, ApiError> {
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => {
                    let state = match patch.state {
                        Some(wsctl_api::PatchState::Running) => SessionState::Starting,
                        Some(wsctl_api::PatchState::Hibernated) => SessionState::Hibernated,
                        None => SessionState::Hibernated,
                    };
                    Ok(Self::make_session(name, state))
                }
            }
        }

        async fn delete_session(&self, _name: &SessionName) -> std::result::Result<(), ApiError> {
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        async fn session_logs(
            &self,
            _name: &SessionName,
            _max_lines: Option<u32>,
        ) -> std::result::Result<String, ApiError> {
            Ok(String::new())
        }
    }

    /// Captures every notification for assertion.
    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<(String, String, String)> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, topic: &str, title: &str, detail: &str) {
            self.messages.lock().unwrap().push((
                topic.to_string(),
                title.to_string(),
                detail.to_string(),
            ));
        }
    }

    fn dispatcher(
        api: Arc<StubApi>,
    ) -> (ActionDispatcher, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = ActionDispatcher::new(api, Arc::clone(&notifier) as Arc<dyn Notifier>);
        (dispatcher, notifier)
    }

    #[tokio::test]
    async fn test_successful_mutation_keeps_flag_set() {
        let (dispatcher, notifier) = dispatcher(StubApi::ok());
        let name = SessionName::new("s1");

        dispatcher.resume(&name).await.unwrap();

        // Flag survives success until the poller confirms the transition
        assert_eq!(dispatcher.flag_for(&name), Some(InFlightFlag::Resuming));
        assert!(notifier.messages().is_empty());

        dispatcher.clear_flag(&name);
        assert_eq!(dispatcher.flag_for(&name), None);
    }

    #[tokio::test]
    async fn test_failed_mutation_resets_flag_and_notifies() {
        let api = StubApi::failing(ApiError::Status {
            status: 409,
            message: "session is busy".to_string(),
        });
        let (dispatcher, notifier) = dispatcher(api);
        let name = SessionName::new("s1");

        let error = dispatcher.hibernate(&name).await.unwrap_err();

        assert_eq!(dispatcher.flag_for(&name), None, "flag reset on failure");
        assert!(matches!(
            error,
            ClientError::Mutation {
                title: TITLE_PAUSE,
                ..
            }
        ));

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, NOTIFY_TOPIC);
        assert_eq!(messages[0].1, TITLE_PAUSE);
        // Server prose forwarded verbatim
        assert_eq!(messages[0].2, "session is busy");
    }

    #[tokio::test]
    async fn test_each_action_uses_its_own_title() {
        let api = StubApi::failing(ApiError::Transport("refused".to_string()));
        let (dispatcher, notifier) = dispatcher(api);
        let name = SessionName::new("s1");

        let _ = dispatcher.resume(&name).await;
        let _ = dispatcher.hibernate(&name).await;
        let _ = dispatcher.change_resource_class(&name, 7).await;
        let _ = dispatcher.stop(&name).await;

        let titles: Vec<String> = notifier
            .messages()
            .into_iter()
            .map(|(_, title, _)| title)
            .collect();
        assert_eq!(
            titles,
            vec![TITLE_RESUME, TITLE_PAUSE, TITLE_MODIFY, TITLE_DELETE]
        );
    }

    #[tokio::test]
    async fn test_launch_failure_notifies_without_flag() {
        let api = StubApi::failing(ApiError::Status {
            status: 422,
            message: "branch does not exist".to_string(),
        });
        let (dispatcher, notifier) = dispatcher(api);

        let request = SessionCreateRequest::new("team", "analysis", "main", "abc123", 3);
        let error = dispatcher.launch(&request).await.unwrap_err();

        assert!(matches!(
            error,
            ClientError::Mutation {
                title: TITLE_START,
                ..
            }
        ));
        assert!(dispatcher.flags().is_empty());
        assert_eq!(notifier.messages()[0].1, TITLE_START);
    }

    #[tokio::test]
    async fn test_flags_are_per_session() {
        let (dispatcher, _) = dispatcher(StubApi::ok());
        let first = SessionName::new("s1");
        let second = SessionName::new("s2");

        dispatcher.stop(&first).await.unwrap();
        dispatcher.resume(&second).await.unwrap();

        let flags = dispatcher.flags();
        assert_eq!(flags.flag_for(&first), Some(InFlightFlag::Stopping));
        assert_eq!(flags.flag_for(&second), Some(InFlightFlag::Resuming));
        assert!(flags.is_busy(&first));

        dispatcher.clear_flag(&first);
        assert!(!dispatcher.flags().is_busy(&first));
        assert!(dispatcher.flags().is_busy(&second));
    }

    #[tokio::test]
    async fn test_subscribers_observe_flag_changes() {
        let (dispatcher, _) = dispatcher(StubApi::ok());
        let name = SessionName::new("s1");
        let mut rx = dispatcher.subscribe();

        assert!(rx.borrow_and_update().is_empty());

        dispatcher.resume(&name).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_busy(&name));

        dispatcher.clear_flag(&name);
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_busy(&name));
    }
}
