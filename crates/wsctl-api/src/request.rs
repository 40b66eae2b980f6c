//! Request bodies for session mutations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wsctl_core::Quantity;

/// Cloud storage volume mounted into a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudStorageMount {
    /// Configured storage identifier
    pub storage_id: String,

    /// Path within the remote storage
    #[serde(default)]
    pub source_path: String,

    /// Mount point inside the session container
    pub target_path: String,

    /// Mount read-only
    #[serde(default)]
    pub readonly: bool,

    /// Backend-specific options passed through verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configuration: BTreeMap<String, serde_json::Value>,
}

/// Body of the session create call.
///
/// Produces a session in state `starting`; the caller then waits for
/// `starting` or `running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreateRequest {
    /// Owning namespace
    pub namespace: String,

    /// Project slug
    pub project: String,

    /// Branch to clone
    pub branch: String,

    /// Commit to check out
    pub commit_sha: String,

    /// Resource class to schedule against
    pub resource_class_id: u32,

    /// Relative URL path the session UI opens on
    #[serde(default)]
    pub default_url: String,

    /// Workspace disk override; server default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Quantity>,

    /// Runtime image override; project image applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Extra environment for the session container
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,

    /// Cloud storage volumes to mount
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cloud_storage: Vec<CloudStorageMount>,

    /// Fetch LFS objects during clone
    #[serde(default)]
    pub lfs_auto_fetch: bool,
}

impl SessionCreateRequest {
    /// Creates a request with required fields and server defaults for
    /// everything else.
    pub fn new(
        namespace: impl Into<String>,
        project: impl Into<String>,
        branch: impl Into<String>,
        commit_sha: impl Into<String>,
        resource_class_id: u32,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            project: project.into(),
            branch: branch.into(),
            commit_sha: commit_sha.into(),
            resource_class_id,
            default_url: String::new(),
            storage: None,
            image: None,
            environment_variables: BTreeMap::new(),
            cloud_storage: Vec::new(),
            lfs_auto_fetch: false,
        }
    }
}

// ============================================================================
// Patch Bodies
// ============================================================================

/// The only two states a patch may request.
///
/// `starting`, `stopping`, and `failed` are server-owned; a delete is its
/// own call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchState {
    Running,
    Hibernated,
}

/// Body of the session patch call.
///
/// Fields are independent: a state-only patch resumes or pauses, a
/// class-only patch reschedules a hibernated or failed session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    /// Target lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PatchState>,

    /// New resource class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_class_id: Option<u32>,
}

impl SessionPatch {
    /// Creates a patch that resumes a hibernated session.
    pub fn resume() -> Self {
        Self {
            state: Some(PatchState::Running),
            ..Self::default()
        }
    }

    /// Creates a patch that pauses a running session.
    pub fn hibernate() -> Self {
        Self {
            state: Some(PatchState::Hibernated),
            ..Self::default()
        }
    }

    /// Creates a patch that changes the resource class.
    pub fn change_class(resource_class_id: u32) -> Self {
        Self {
            resource_class_id: Some(resource_class_id),
            ..Self::default()
        }
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.resource_class_id.is_none()
    }
}
