//! wsctl API - Wire contract for the session platform
//!
//! Request and response bodies exchanged with the platform's HTTP API.
//! Domain types come from wsctl-core; this crate only adds the shapes
//! that exist on the wire and nowhere else.

pub mod request;
pub mod response;

// Re-exports for convenience
pub use request::{CloudStorageMount, PatchState, SessionCreateRequest, SessionPatch};
pub use response::{ApiErrorBody, ErrorEnvelope, SessionList};
