//! wsctl client - Session lifecycle control
//!
//! This crate drives session lifecycle operations against the platform
//! API and tracks their asynchronous completion.
//!
//! # Architecture
//!
//! Four layers, leaf-first:
//!
//! 1. **Collaborator traits** ([`api`]): the query/mutation surface, the
//!    working-tree probe, and the notification sink, plus the HTTP
//!    implementation ([`http`])
//! 2. **Status Poller** ([`poller`]): watches one session until it
//!    reaches a desired state, with cooperative cancellation
//! 3. **Action Dispatcher** ([`dispatcher`]): one request per user
//!    intent, optimistic in-flight flags, failures to the notifier
//! 4. **Action Surface** ([`controller`]): the legality table and the
//!    composed operations behind each user action
//!
//! Recoverable conditions (transient fetch errors, unknown states) are
//! absorbed here and never panic; mutation failures are the one category
//! surfaced to the user.

pub mod api;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod poller;

pub use api::{Notifier, RepositoryProbe, SessionApi, TracingNotifier};
pub use controller::{
    default_action, is_scheduling_failure, legal_actions, SessionAction, SessionController,
};
pub use dispatcher::{ActionDispatcher, InFlightFlag, InFlightFlags, NOTIFY_TOPIC};
pub use error::{ApiError, ClientError, Result};
pub use http::{ApiConfig, HttpSessionApi};
pub use poller::{DesiredStates, StatusPoller, WaitHandle, WaitOutcome};
