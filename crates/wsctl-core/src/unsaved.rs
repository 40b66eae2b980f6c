//! Unsaved-work rules for destructive session actions.
//!
//! Pausing or deleting a session can lose work that was never committed
//! or never pushed. The rules here decide whether to warn and with which
//! phrase, from hibernation annotations (paused sessions) or a live
//! working-tree probe (running sessions). Everything is synchronous; the
//! caller resolves the probe beforehand and passes the result in.

use crate::session::{Session, SessionState};
use serde::{Deserialize, Serialize};

/// Live working-tree report from a session's status sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingTreeStatus {
    /// Commits ahead of the remote branch
    pub ahead: u64,
    /// True when there are no uncommitted files
    pub clean: bool,
}

/// What kind of unsaved work a destructive action would lose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsavedWork {
    /// No record or probe available; risk must be assumed
    Unknown,
    /// Uncommitted files and unpushed commits
    DirtyAndUnsynced,
    /// Uncommitted files only
    Dirty,
    /// Unpushed commits only
    Unsynced,
}

impl UnsavedWork {
    /// Returns the explanation phrase shown in confirmation prompts.
    #[must_use]
    pub fn detail(&self) -> &'static str {
        match self {
            Self::Unknown => "uncommitted files and/or unsynced commits",
            Self::DirtyAndUnsynced => "uncommitted files and unsynced commits",
            Self::Dirty => "uncommitted files",
            Self::Unsynced => "unsynced commits",
        }
    }

    /// Picks the warning kind from the two risk signals.
    ///
    /// Returns `None` when the tree is clean and fully pushed.
    fn from_flags(dirty: bool, synchronized: bool) -> Option<Self> {
        match (dirty, synchronized) {
            (false, true) => None,
            (true, false) => Some(Self::DirtyAndUnsynced),
            (true, true) => Some(Self::Dirty),
            (false, false) => Some(Self::Unsynced),
        }
    }
}

/// Decides whether a destructive action on `session` risks unsaved work.
///
/// Deterministic and total. `working_tree` is consulted only for running
/// sessions; pass `None` when the probe failed or was never attempted,
/// which counts as risk present (fail safe).
///
/// # Returns
///
/// `Some` with the warning kind when the user should be asked to confirm,
/// `None` when the action is safe or the state carries no unsaved work.
pub fn assess_unsaved_work(
    session: &Session,
    working_tree: Option<&WorkingTreeStatus>,
) -> Option<UnsavedWork> {
    match session.state() {
        SessionState::Hibernated => {
            let annotations = &session.annotations;
            if !annotations.has_hibernation_record() {
                return Some(UnsavedWork::Unknown);
            }
            UnsavedWork::from_flags(
                annotations.hibernation_dirty,
                annotations.hibernation_synchronized,
            )
        }
        SessionState::Running => match working_tree {
            None => Some(UnsavedWork::Unknown),
            Some(tree) => UnsavedWork::from_flags(!tree.clean, tree.ahead == 0),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::SessionAnnotations;
    use crate::resources::SessionResources;
    use crate::session::{SessionName, SessionStatus};
    use chrono::Utc;

    /// Creates a test session in the given state.
    fn create_test_session(state: SessionState) -> Session {
        Session {
            name: SessionName::new("anna-flights-8a9f2c1d"),
            status: SessionStatus::from_state(state),
            annotations: SessionAnnotations::default(),
            resources: SessionResources::default(),
            started: Utc::now(),
            image: String::new(),
            url: String::new(),
        }
    }

    /// Creates a hibernated session with a full hibernation record.
    fn create_hibernated_session(dirty: bool, synchronized: bool) -> Session {
        let mut session = create_test_session(SessionState::Hibernated);
        session.annotations.hibernation_date = Some(Utc::now());
        session.annotations.hibernation_dirty = dirty;
        session.annotations.hibernation_synchronized = synchronized;
        session
    }

    #[test]
    fn test_hibernated_without_record_warns() {
        let session = create_test_session(SessionState::Hibernated);
        let warning = assess_unsaved_work(&session, None);
        assert_eq!(
            warning.map(|w| w.detail()),
            Some("uncommitted files and/or unsynced commits")
        );
    }

    #[test]
    fn test_hibernated_clean_and_synchronized_is_safe() {
        let session = create_hibernated_session(false, true);
        assert_eq!(assess_unsaved_work(&session, None), None);
    }

    #[test]
    fn test_hibernated_dirty_only() {
        let session = create_hibernated_session(true, true);
        assert_eq!(
            assess_unsaved_work(&session, None).map(|w| w.detail()),
            Some("uncommitted files")
        );
    }

    #[test]
    fn test_hibernated_unsynchronized_only() {
        let session = create_hibernated_session(false, false);
        assert_eq!(
            assess_unsaved_work(&session, None).map(|w| w.detail()),
            Some("unsynced commits")
        );
    }

    #[test]
    fn test_hibernated_dirty_and_unsynchronized() {
        let session = create_hibernated_session(true, false);
        assert_eq!(
            assess_unsaved_work(&session, None).map(|w| w.detail()),
            Some("uncommitted files and unsynced commits")
        );
    }

    #[test]
    fn test_running_without_probe_assumes_unsaved() {
        let session = create_test_session(SessionState::Running);
        assert_eq!(
            assess_unsaved_work(&session, None).map(|w| w.detail()),
            Some("uncommitted files and/or unsynced commits")
        );
    }

    #[test]
    fn test_running_clean_and_pushed_is_safe() {
        let session = create_test_session(SessionState::Running);
        let tree = WorkingTreeStatus { ahead: 0, clean: true };
        assert_eq!(assess_unsaved_work(&session, Some(&tree)), None);
    }

    #[test]
    fn test_running_dirty_and_ahead() {
        let session = create_test_session(SessionState::Running);
        let tree = WorkingTreeStatus { ahead: 2, clean: false };
        assert_eq!(
            assess_unsaved_work(&session, Some(&tree)).map(|w| w.detail()),
            Some("uncommitted files and unsynced commits")
        );
    }

    #[test]
    fn test_running_ahead_only() {
        let session = create_test_session(SessionState::Running);
        let tree = WorkingTreeStatus { ahead: 1, clean: true };
        assert_eq!(
            assess_unsaved_work(&session, Some(&tree)).map(|w| w.detail()),
            Some("unsynced commits")
        );
    }

    #[test]
    fn test_running_dirty_only() {
        let session = create_test_session(SessionState::Running);
        let tree = WorkingTreeStatus { ahead: 0, clean: false };
        assert_eq!(
            assess_unsaved_work(&session, Some(&tree)).map(|w| w.detail()),
            Some("uncommitted files")
        );
    }

    #[test]
    fn test_other_states_never_warn() {
        for state in [
            SessionState::Starting,
            SessionState::Stopping,
            SessionState::Failed,
            SessionState::Unknown,
        ] {
            let session = create_test_session(state);
            assert_eq!(assess_unsaved_work(&session, None), None, "state {state:?}");
        }
    }

    #[test]
    fn test_probe_ignored_for_hibernated_sessions() {
        // Annotations are the sole source of truth once hibernated
        let session = create_hibernated_session(false, true);
        let dirty_tree = WorkingTreeStatus { ahead: 5, clean: false };
        assert_eq!(assess_unsaved_work(&session, Some(&dirty_tree)), None);
    }
}
