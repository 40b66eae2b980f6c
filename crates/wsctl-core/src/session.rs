//! Session domain entities and value objects.

use crate::annotations::SessionAnnotations;
use crate::resources::SessionResources;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a compute session.
///
/// Wraps the server-assigned name (e.g., "anna-flights-8a9f2c1d").
/// The platform generates names; this does not validate their format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionName(String);

impl SessionName {
    /// Creates a new SessionName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Server-reported lifecycle state of a session.
///
/// "Not found" is expressed by the absence of a session record, never by
/// a state value. Unrecognized state strings deserialize to [`Unknown`]
/// so classification stays total when the server grows new states.
///
/// [`Unknown`]: SessionState::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Containers are being scheduled and started.
    Starting,

    /// Session is up and reachable at its URL.
    Running,

    /// Delete in progress; the record disappears when it completes.
    Stopping,

    /// Compute released, filesystem preserved until resume or reaping.
    Hibernated,

    /// Startup or backend failure; recoverable only via the
    /// modify-and-retry pathway.
    Failed,

    /// State string this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl SessionState {
    /// Returns the display label for this state.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Hibernated => "Paused",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown state",
        }
    }

    /// Returns the ASCII icon for this state.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Starting => "+",
            Self::Running => ">",
            Self::Stopping => "-",
            Self::Hibernated => "=",
            Self::Failed => "!",
            Self::Unknown => "?",
        }
    }

    /// Returns true if the session is up and reachable.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if the session is paused with its filesystem preserved.
    #[must_use]
    pub fn is_hibernated(&self) -> bool {
        matches!(self, Self::Hibernated)
    }

    /// Returns true if the session is mid-transition (starting or stopping).
    #[must_use]
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Session Status
// ============================================================================

/// One step of the server's startup/teardown progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStep {
    /// Step name (e.g., "Pulling image", "Cloning repository")
    pub step: String,
    /// Step outcome as reported by the server
    pub status: String,
}

/// Server-reported status block of a session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Lifecycle state
    pub state: SessionState,

    /// Server prose accompanying the state (failure reasons, scheduling
    /// messages); absent when there is nothing to report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Containers currently ready
    #[serde(default)]
    pub ready_containers: u32,

    /// Containers expected for a fully-up session
    #[serde(default)]
    pub total_containers: u32,

    /// Startup/teardown steps in server order
    #[serde(default)]
    pub details: Vec<StatusStep>,
}

impl SessionStatus {
    /// Creates a status block with just a state, for the common case.
    pub fn from_state(state: SessionState) -> Self {
        Self {
            state,
            message: None,
            ready_containers: 0,
            total_containers: 0,
            details: Vec::new(),
        }
    }

    /// Formats container readiness as "ready/total".
    pub fn readiness(&self) -> String {
        format!("{}/{}", self.ready_containers, self.total_containers)
    }
}

// ============================================================================
// Domain Entity
// ============================================================================

/// A user's interactive compute workspace instance.
///
/// One entity exists per name at any time; the set of a user's sessions
/// is a mapping keyed by name with no implied ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Stable server-assigned identifier
    pub name: SessionName,

    /// Server-reported status block
    pub status: SessionStatus,

    /// Provenance and hibernation metadata
    #[serde(default)]
    pub annotations: SessionAnnotations,

    /// Resource quantities actually granted
    #[serde(default)]
    pub resources: SessionResources,

    /// When the session was created
    pub started: DateTime<Utc>,

    /// Runtime image reference
    #[serde(default)]
    pub image: String,

    /// Reachable session endpoint
    #[serde(default)]
    pub url: String,
}

impl Session {
    /// Returns the session's lifecycle state.
    ///
    /// Total for every reachable record: unrecognized server strings have
    /// already been mapped to [`SessionState::Unknown`] at decode time.
    pub fn state(&self) -> SessionState {
        self.status.state
    }

    /// Returns the session age (time since creation).
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.started)
    }
}

/// Formats a duration for human-readable display.
pub fn format_age(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds();
    if secs < 0 {
        return "now".to_string();
    }
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        format!("{mins}m")
    } else if secs < 86400 {
        let hours = secs / 3600;
        format!("{hours}h")
    } else {
        let days = secs / 86400;
        format!("{days}d")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a test session in the given state.
    fn create_test_session(name: &str, state: SessionState) -> Session {
        Session {
            name: SessionName::new(name),
            status: SessionStatus::from_state(state),
            annotations: SessionAnnotations::default(),
            resources: SessionResources::default(),
            started: Utc::now(),
            image: "registry.example.org/py:3.12".to_string(),
            url: format!("https://sessions.example.org/{name}"),
        }
    }

    #[test]
    fn test_session_name_round_trip() {
        let name = SessionName::new("anna-flights-8a9f2c1d");
        assert_eq!(name.as_str(), "anna-flights-8a9f2c1d");
        assert_eq!(format!("{name}"), "anna-flights-8a9f2c1d");
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(SessionState::Starting.label(), "Starting");
        assert_eq!(SessionState::Running.label(), "Running");
        assert_eq!(SessionState::Hibernated.label(), "Paused");
        assert_eq!(SessionState::Failed.label(), "Failed");
        assert_eq!(SessionState::Unknown.label(), "Unknown state");
    }

    #[test]
    fn test_state_deserializes_lowercase() {
        let state: SessionState = serde_json::from_str("\"hibernated\"").unwrap();
        assert_eq!(state, SessionState::Hibernated);
    }

    #[test]
    fn test_unrecognized_state_maps_to_unknown() {
        let state: SessionState = serde_json::from_str("\"quarantined\"").unwrap();
        assert_eq!(state, SessionState::Unknown);
        assert_eq!(state.label(), "Unknown state");
    }

    #[test]
    fn test_classification_is_stable() {
        let session = create_test_session("s1", SessionState::Running);
        assert_eq!(session.state(), session.state());
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn test_state_predicates() {
        assert!(SessionState::Running.is_running());
        assert!(SessionState::Hibernated.is_hibernated());
        assert!(SessionState::Starting.is_transitional());
        assert!(SessionState::Stopping.is_transitional());
        assert!(!SessionState::Failed.is_transitional());
    }

    #[test]
    fn test_status_readiness() {
        let mut status = SessionStatus::from_state(SessionState::Starting);
        status.ready_containers = 1;
        status.total_containers = 4;
        assert_eq!(status.readiness(), "1/4");
    }

    #[test]
    fn test_status_details_preserve_order() {
        let json = r#"{
            "state": "starting",
            "details": [
                {"step": "Scheduling", "status": "done"},
                {"step": "Pulling image", "status": "running"},
                {"step": "Cloning repository", "status": "waiting"}
            ]
        }"#;
        let status: SessionStatus = serde_json::from_str(json).unwrap();
        let steps: Vec<&str> = status.details.iter().map(|d| d.step.as_str()).collect();
        assert_eq!(steps, vec!["Scheduling", "Pulling image", "Cloning repository"]);
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::seconds(35)), "35s");
        assert_eq!(format_age(chrono::Duration::seconds(150)), "2m");
        assert_eq!(format_age(chrono::Duration::hours(3)), "3h");
        assert_eq!(format_age(chrono::Duration::days(2)), "2d");
        assert_eq!(format_age(chrono::Duration::seconds(-5)), "now");
    }
}
