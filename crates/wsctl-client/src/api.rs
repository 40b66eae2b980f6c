//! Contracts between the controller and its collaborators.
//!
//! The controller never talks to concrete transports; it is handed these
//! traits at construction. Production wires in [`HttpSessionApi`], tests
//! wire in scripted mocks.
//!
//! [`HttpSessionApi`]: crate::http::HttpSessionApi

use crate::error::ApiError;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;
use wsctl_api::{SessionCreateRequest, SessionPatch};
use wsctl_core::{Session, SessionName, WorkingTreeStatus};

/// Query and mutation surface of the session platform.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Fetches all of the user's sessions, keyed by name.
    async fn list_sessions(&self) -> Result<HashMap<String, Session>, ApiError>;

    /// Fetches one session.
    ///
    /// Returns `Ok(None)` when the record does not exist; 404 is not an
    /// error at this seam.
    async fn get_session(&self, name: &SessionName) -> Result<Option<Session>, ApiError>;

    /// Creates a session; the record starts in state `starting`.
    async fn create_session(&self, request: &SessionCreateRequest) -> Result<Session, ApiError>;

    /// Applies a state or resource-class patch, returning the updated record.
    async fn patch_session(
        &self,
        name: &SessionName,
        patch: &SessionPatch,
    ) -> Result<Session, ApiError>;

    /// Deletes a session; the record transitions to `stopping` and then
    /// disappears.
    async fn delete_session(&self, name: &SessionName) -> Result<(), ApiError>;

    /// Fetches recent container logs.
    async fn session_logs(
        &self,
        name: &SessionName,
        max_lines: Option<u32>,
    ) -> Result<String, ApiError>;
}

/// Live working-tree probe served by a session's status sidecar.
///
/// Only meaningful for running sessions; hibernated sessions carry their
/// equivalent in annotations.
#[async_trait]
pub trait RepositoryProbe: Send + Sync {
    /// Reports ahead-commit count and dirty state of the session's clone.
    async fn working_tree(&self, name: &SessionName) -> Result<WorkingTreeStatus, ApiError>;
}

// ============================================================================
// Notification Sink
// ============================================================================

/// Fire-and-forget sink for user-facing notifications.
///
/// Mutation failures are delivered here with a fixed per-action title and
/// the raw server message as detail. Delivery must not block or fail the
/// calling operation.
pub trait Notifier: Send + Sync {
    fn notify(&self, topic: &str, title: &str, detail: &str);
}

/// Default sink: structured warning in the log stream.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, topic: &str, title: &str, detail: &str) {
        warn!(topic, title, detail, "Notification");
    }
}
