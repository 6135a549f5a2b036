//! Local State Mirror
//!
//! The in-memory ordered list of the current user's tasks, authoritative
//! for rendering. Every operation is synchronous and applied as a whole;
//! callers hold the surrounding lock only for the duration of the call and
//! never across a remote request.

use crate::domain::{Task, TaskId};

/// Ordered mirror of the remote rows for one owner.
///
/// Ordering follows creation time as recorded by the remote store; loads
/// replace the sequence wholesale and confirmed creates append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskMirror {
    tasks: Vec<Task>,
}

/// Immutable copy of the mirror sequence, captured for later restoration
#[derive(Debug, Clone)]
pub struct MirrorSnapshot(Vec<Task>);

impl TaskMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole sequence with freshly loaded rows
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Append a server-confirmed task to the end
    pub fn insert(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Overwrite the entry with matching id; returns false when absent
    pub fn replace(&mut self, id: &TaskId, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| &t.id == id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    /// Delete the entry with matching id; returns false when absent
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        self.tasks.len() != before
    }

    /// Capture the current sequence for a later [`restore`](Self::restore)
    pub fn snapshot(&self) -> MirrorSnapshot {
        MirrorSnapshot(self.tasks.clone())
    }

    /// Replace the sequence wholesale with a previously captured snapshot
    pub fn restore(&mut self, snapshot: MirrorSnapshot) {
        self.tasks = snapshot.0;
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
