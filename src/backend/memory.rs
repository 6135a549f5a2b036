//! In-Memory Backend
//!
//! Reference implementation of [`AuthBackend`] and [`TaskBackend`] backed by
//! plain collections. Used by the test suite, with per-operation failure
//! injection and call counting so reconciliation paths can be exercised
//! deterministically.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::domain::{DomainError, DomainResult, Session, Task, TaskChanges, TaskId, UserId};

use super::traits::{AuthBackend, TaskBackend};

/// Row-store operations, used to address failure injection and call counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOp {
    List,
    Create,
    Update,
    Delete,
}

struct UserRecord {
    user_id: UserId,
    password: String,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserRecord>,
    session: Option<Session>,
    tasks: Vec<Task>,
    next_user: u32,
    next_task: u32,
    clock: i64,
    fail_next: HashMap<TaskOp, String>,
    calls: HashMap<TaskOp, u32>,
}

/// In-memory auth + row store
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory backend lock poisoned")
    }

    /// Register an account without going through the email flow
    pub fn with_user(&self, email: &str, password: &str) -> UserId {
        let mut inner = self.lock();
        inner.next_user += 1;
        let user_id = format!("user-{}", inner.next_user);
        inner.users.insert(
            email.to_string(),
            UserRecord {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        user_id
    }

    /// Insert a task directly, as if it had been created earlier
    pub fn seed_task(&self, owner: &UserId, title: &str, completed: bool) -> Task {
        let mut inner = self.lock();
        let mut task = new_row(&mut inner, title, owner);
        task.completed = completed;
        inner.tasks.push(task.clone());
        task
    }

    /// Make the next invocation of `op` fail with `message`
    pub fn fail_next(&self, op: TaskOp, message: &str) {
        self.lock().fail_next.insert(op, message.to_string());
    }

    /// Number of times `op` reached the backend
    pub fn calls(&self, op: TaskOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Complete a previously requested magic link, as the emailed
    /// confirmation would
    pub fn complete_magic_link(&self, email: &str) -> DomainResult<Session> {
        let mut inner = self.lock();
        let user = inner
            .users
            .get(email)
            .ok_or_else(|| DomainError::NotFound(format!("no account for {}", email)))?;
        let session = Session::new(user.user_id.clone(), Some(email.to_string()));
        inner.session = Some(session.clone());
        Ok(session)
    }

    /// Land the password-recovery email, establishing a recovery session
    pub fn begin_recovery(&self, email: &str) -> DomainResult<Session> {
        let mut inner = self.lock();
        let user = inner
            .users
            .get(email)
            .ok_or_else(|| DomainError::NotFound(format!("no account for {}", email)))?;
        let session = Session::recovery(user.user_id.clone(), Some(email.to_string()));
        inner.session = Some(session.clone());
        Ok(session)
    }

    fn check_failure(inner: &mut Inner, op: TaskOp) -> DomainResult<()> {
        *inner.calls.entry(op).or_insert(0) += 1;
        match inner.fail_next.remove(&op) {
            Some(message) => Err(DomainError::Backend(message)),
            None => Ok(()),
        }
    }
}

fn new_row(inner: &mut Inner, title: &str, owner: &UserId) -> Task {
    inner.next_task += 1;
    inner.clock += 1;
    let created_at = Utc
        .timestamp_opt(1_700_000_000 + inner.clock, 0)
        .single();
    Task {
        id: inner.next_task.to_string(),
        title: title.to_string(),
        completed: false,
        owner: owner.clone(),
        created_at,
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> DomainResult<()> {
        let mut inner = self.lock();
        if inner.users.contains_key(email) {
            return Err(DomainError::Conflict(format!(
                "account already exists for {}",
                email
            )));
        }
        inner.next_user += 1;
        let user_id = format!("user-{}", inner.next_user);
        inner.users.insert(
            email.to_string(),
            UserRecord {
                user_id,
                password: password.to_string(),
            },
        );
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> DomainResult<Session> {
        let mut inner = self.lock();
        let user = inner
            .users
            .get(email)
            .filter(|u| u.password == password)
            .ok_or_else(|| DomainError::Unauthorized("invalid credentials".to_string()))?;
        let session = Session::new(user.user_id.clone(), Some(email.to_string()));
        inner.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_in_with_magic_link(&self, email: &str, _redirect: &str) -> DomainResult<()> {
        // Email delivery is out of band; tests call complete_magic_link
        let inner = self.lock();
        if inner.users.contains_key(email) {
            Ok(())
        } else {
            Err(DomainError::NotFound(format!("no account for {}", email)))
        }
    }

    async fn request_password_reset(&self, email: &str, _redirect: &str) -> DomainResult<()> {
        let inner = self.lock();
        if inner.users.contains_key(email) {
            Ok(())
        } else {
            Err(DomainError::NotFound(format!("no account for {}", email)))
        }
    }

    async fn update_password(&self, new_password: &str) -> DomainResult<()> {
        let mut inner = self.lock();
        let email = inner
            .session
            .as_ref()
            .and_then(|s| s.email.clone())
            .ok_or_else(|| DomainError::Unauthorized("no active session".to_string()))?;
        match inner.users.get_mut(&email) {
            Some(user) => {
                user.password = new_password.to_string();
                Ok(())
            }
            None => Err(DomainError::NotFound(format!("no account for {}", email))),
        }
    }

    async fn sign_out(&self) -> DomainResult<()> {
        self.lock().session = None;
        Ok(())
    }

    async fn current_session(&self) -> DomainResult<Option<Session>> {
        Ok(self.lock().session.clone())
    }
}

#[async_trait]
impl TaskBackend for MemoryBackend {
    async fn list_tasks(&self, owner: &UserId) -> DomainResult<Vec<Task>> {
        let mut inner = self.lock();
        MemoryBackend::check_failure(&mut inner, TaskOp::List)?;
        let mut rows: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| &t.owner == owner)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.created_at);
        Ok(rows)
    }

    async fn create_task(&self, title: &str, owner: &UserId) -> DomainResult<Task> {
        let mut inner = self.lock();
        MemoryBackend::check_failure(&mut inner, TaskOp::Create)?;
        if title.trim().is_empty() {
            return Err(DomainError::InvalidInput("empty title".to_string()));
        }
        let task = new_row(&mut inner, title, owner);
        inner.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, changes: &TaskChanges) -> DomainResult<Task> {
        let mut inner = self.lock();
        MemoryBackend::check_failure(&mut inner, TaskOp::Update)?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("task {}", id)))?;
        if let Some(title) = &changes.title {
            task.title = title.clone();
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> DomainResult<()> {
        let mut inner = self.lock();
        MemoryBackend::check_failure(&mut inner, TaskOp::Delete)?;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| &t.id != id);
        if inner.tasks.len() == before {
            return Err(DomainError::NotFound(format!("task {}", id)));
        }
        Ok(())
    }
}
