//! Backend Layer - Core Traits
//!
//! Defines the abstract interfaces for the remote collaborator.
//! Implementations can use HTTP, in-memory, etc.

use async_trait::async_trait;

use crate::domain::{DomainResult, Session, Task, TaskChanges, TaskId, UserId};

/// Authentication half of the remote backend.
///
/// Magic-link and password-reset flows complete out of band: the backend
/// sends an email and the session materialises later, surfaced through
/// `current_session` once the credential lands.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Register a new email/password account
    async fn sign_up(&self, email: &str, password: &str) -> DomainResult<()>;

    /// Establish a session from email/password credentials
    async fn sign_in_with_password(&self, email: &str, password: &str) -> DomainResult<Session>;

    /// Send a one-time sign-in link to `email`; `redirect` is where the
    /// link lands after confirmation
    async fn sign_in_with_magic_link(&self, email: &str, redirect: &str) -> DomainResult<()>;

    /// Send a password-reset email; completing it yields a recovery session
    async fn request_password_reset(&self, email: &str, redirect: &str) -> DomainResult<()>;

    /// Replace the password of the currently authenticated user
    async fn update_password(&self, new_password: &str) -> DomainResult<()>;

    /// Invalidate the current credential
    async fn sign_out(&self) -> DomainResult<()>;

    /// The session attached to the currently held credential, if any
    async fn current_session(&self) -> DomainResult<Option<Session>>;
}

/// Row-store half of the remote backend.
///
/// All operations are scoped to the authenticated user; the server echo is
/// the canonical record for every mutation.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// List all tasks for `owner`, ascending by creation time
    async fn list_tasks(&self, owner: &UserId) -> DomainResult<Vec<Task>>;

    /// Create a task; the server assigns the id and defaults `completed`
    /// to false
    async fn create_task(&self, title: &str, owner: &UserId) -> DomainResult<Task>;

    /// Apply a partial update and return the canonical record
    async fn update_task(&self, id: &TaskId, changes: &TaskChanges) -> DomainResult<Task>;

    /// Delete the task with the given id
    async fn delete_task(&self, id: &TaskId) -> DomainResult<()>;
}
