//! wsctl Core - Shared domain types for session lifecycle control
//!
//! This crate provides the pure domain model shared between the HTTP
//! client (wsctl-client) and the CLI (wsctl): session states, resource
//! quantities, hibernation annotations, and the unsaved-work rules.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod annotations;
pub mod error;
pub mod resources;
pub mod session;
pub mod unsaved;

// Re-exports for convenience
pub use annotations::SessionAnnotations;
pub use error::{DomainError, DomainResult};
pub use resources::{Quantity, ResourceRequests, SessionResources};
pub use session::{format_age, Session, SessionName, SessionState, SessionStatus, StatusStep};
pub use unsaved::{assess_unsaved_work, UnsavedWork, WorkingTreeStatus};
