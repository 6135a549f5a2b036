//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO external dependencies (except serde and chrono for
//! serialization of backend rows).

mod entity;
mod session;
mod task;

pub use entity::{DomainError, DomainResult, Entity};
pub use session::{Session, SessionKind, UserId};
pub use task::{normalized_title, Task, TaskChanges, TaskId};
