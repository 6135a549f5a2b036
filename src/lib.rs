//! Tasktrack Core
//!
//! Client-side core of a minimal personal task tracker backed by a hosted
//! auth + row store. The UI layer renders the mirror and forwards user
//! intents; everything stateful lives here.
//!
//! Layered architecture:
//! - `domain`: Core entities and business rules
//! - `backend`: Remote collaborator abstractions and implementations
//! - `store`: The Local State Mirror rendering reads from
//! - `sessions`: Session state with change notification
//! - `optimistic`: The three-phase optimistic mutation helper
//! - `app`: Reconciliation handlers tying it all together

pub mod app;
pub mod backend;
pub mod domain;
pub mod optimistic;
pub mod sessions;
pub mod store;

pub use app::{EditState, TaskApp};
pub use backend::{AuthBackend, BackendConfig, HttpBackend, MemoryBackend, TaskBackend, TaskOp};
pub use domain::{
    normalized_title, DomainError, DomainResult, Entity, Session, SessionKind, Task, TaskChanges,
    TaskId, UserId,
};
pub use optimistic::OptimisticWrite;
pub use sessions::{SessionHub, Subscription};
pub use store::{MirrorSnapshot, TaskMirror};
