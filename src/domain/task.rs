//! Task Entity
//!
//! A single todo entry owned by one user. Ids are opaque strings assigned
//! by the remote store at creation time and never change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::session::UserId;

/// Opaque server-assigned task identifier
pub type TaskId = String;

/// A todo entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned by the remote store
    pub id: TaskId,
    /// Task text, never empty or whitespace-only once persisted
    pub title: String,
    /// Completion status
    pub completed: bool,
    /// Identifier of the owning user, set at creation
    pub owner: UserId,
    /// Server creation timestamp, used only for ordering
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: TaskId, title: String, owner: UserId) -> Self {
        Self {
            id,
            title,
            completed: false,
            owner,
            created_at: None,
        }
    }
}

impl Entity for Task {
    type Id = TaskId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Partial update sent to the remote store.
///
/// Fields left as `None` are omitted from the request body, so the server
/// only touches what the caller set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskChanges {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}

/// Trim a user-entered title; whitespace-only input yields `None`.
///
/// Empty submissions are rejected before any remote call is made.
pub fn normalized_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
