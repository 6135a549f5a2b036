//! Optimistic Mutation Helper
//!
//! Three-phase write shared by all four mutation kinds: capture the
//! pre-state of the targeted entry, optionally apply an optimistic local
//! change, then either commit the server's canonical record or roll the
//! entry back exactly as it was. Rollback is scoped to the one entry the
//! mutation owns, so it can never clobber a concurrent commit on a
//! different task.

use crate::domain::{DomainError, DomainResult, Task, TaskId};
use crate::store::TaskMirror;

/// One in-flight mutation against a single mirror entry (or, for create,
/// against a not-yet-existing entry).
#[derive(Debug)]
pub struct OptimisticWrite {
    prior: Option<Task>,
    applied: bool,
}

impl OptimisticWrite {
    /// Begin a mutation of an existing entry; fails when the id is unknown
    pub fn for_existing(mirror: &TaskMirror, id: &TaskId) -> DomainResult<Self> {
        let prior = mirror
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("task {}", id)))?;
        Ok(Self {
            prior: Some(prior),
            applied: false,
        })
    }

    /// Begin a create: no pre-state, nothing to roll back
    pub fn for_insert() -> Self {
        Self {
            prior: None,
            applied: false,
        }
    }

    /// The entry as it was when the write began
    pub fn prior(&self) -> Option<&Task> {
        self.prior.as_ref()
    }

    /// Apply an optimistic local change to the targeted entry.
    ///
    /// Only meaningful for writes begun with `for_existing`.
    pub fn apply<F: FnOnce(&mut Task)>(&mut self, mirror: &mut TaskMirror, change: F) {
        if let Some(prior) = &self.prior {
            let mut updated = prior.clone();
            change(&mut updated);
            if mirror.replace(&prior.id, updated) {
                self.applied = true;
            }
        }
    }

    /// Reconcile with the server's canonical record: replace the targeted
    /// entry, or append it when the write was a create
    pub fn commit(self, mirror: &mut TaskMirror, canonical: Task) {
        match &self.prior {
            Some(prior) => {
                mirror.replace(&prior.id, canonical);
            }
            None => mirror.insert(canonical),
        }
    }

    /// Reconcile a confirmed delete
    pub fn commit_removal(self, mirror: &mut TaskMirror) {
        if let Some(prior) = &self.prior {
            mirror.remove(&prior.id);
        }
    }

    /// Reverse the optimistic change, restoring the pre-state entry
    /// field-for-field. A write that applied nothing is a no-op.
    pub fn rollback(self, mirror: &mut TaskMirror) {
        if !self.applied {
            return;
        }
        if let Some(prior) = self.prior {
            log::warn!("rolling back optimistic change to task {}", prior.id);
            let id = prior.id.clone();
            mirror.replace(&id, prior);
        }
    }
}
