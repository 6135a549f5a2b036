//! Task Handlers
//!
//! One handler per user intent, all following the same shape: validate
//! locally, apply any optimistic change, issue the remote request, then
//! reconcile the mirror with the server echo or roll back. Failures are
//! handled here and surfaced as errors; they never leave the mirror in a
//! state inconsistent with "no request was ever sent".

use crate::backend::TaskBackend;
use crate::domain::{normalized_title, DomainError, DomainResult, Task, TaskChanges, TaskId, UserId};
use crate::optimistic::OptimisticWrite;

use super::{EditState, TaskApp};

impl<B> TaskApp<B>
where
    B: TaskBackend + Send + Sync,
{
    /// Fetch all of `owner`'s tasks and replace the mirror wholesale.
    ///
    /// A load that completes after the app was rescoped to a different
    /// owner is discarded; its rows belong to a mirror that no longer
    /// exists.
    pub async fn load_tasks(&self, owner: &UserId) -> DomainResult<()> {
        log::debug!("loading tasks for {}", owner);
        let rows = self.backend.list_tasks(owner).await?;
        let mut st = self.state();
        if st.owner.as_deref() != Some(owner.as_str()) {
            log::warn!("discarding stale load for {}", owner);
            return Ok(());
        }
        let rows: Vec<Task> = rows.into_iter().filter(|t| &t.owner == owner).collect();
        log::info!("loaded {} tasks for {}", rows.len(), owner);
        st.mirror.replace_all(rows);
        Ok(())
    }

    /// Create a task from user input.
    ///
    /// Whitespace-only input is a silent no-op: `Ok(None)` without a
    /// remote call, and the caller keeps the entered text. `Ok(Some)`
    /// means the server confirmed the row and the input field should be
    /// cleared. Nothing is inserted optimistically, so a failure leaves
    /// the mirror untouched.
    pub async fn add_task(&self, title: &str) -> DomainResult<Option<Task>> {
        let title = match normalized_title(title) {
            Some(t) => t,
            None => return Ok(None),
        };
        let owner = self
            .state()
            .owner
            .clone()
            .ok_or_else(|| DomainError::Unauthorized("no active session".to_string()))?;

        let write = OptimisticWrite::for_insert();
        match self.backend.create_task(&title, &owner).await {
            Ok(task) => {
                let mut st = self.state();
                // Signed out while the request was in flight: the row is
                // persisted remotely but belongs to a discarded mirror
                if st.owner.as_deref() == Some(owner.as_str()) {
                    write.commit(&mut st.mirror, task.clone());
                }
                Ok(Some(task))
            }
            Err(e) => {
                log::warn!("create failed: {}", e);
                Err(e)
            }
        }
    }

    /// Flip a task's completion flag, optimistically.
    ///
    /// The flip is visible in the mirror before the request resolves; the
    /// server echo then wins, or a failure restores the pre-toggle entry
    /// field-for-field. Overlapping toggles of the same id are serialized
    /// through a per-id gate.
    pub async fn toggle_task(&self, id: &TaskId) -> DomainResult<Task> {
        let gate = self.gate(id);
        let outcome = {
            let _serial = gate.lock().await;
            self.toggle_serialized(id).await
        };
        drop(gate);
        self.release_gate(id);
        outcome
    }

    async fn toggle_serialized(&self, id: &TaskId) -> DomainResult<Task> {
        let (write, desired) = {
            let mut st = self.state();
            let mut write = OptimisticWrite::for_existing(&st.mirror, id)?;
            let desired = match write.prior() {
                Some(task) => !task.completed,
                None => return Err(DomainError::NotFound(format!("task {}", id))),
            };
            write.apply(&mut st.mirror, |t| t.completed = desired);
            (write, desired)
        };

        let result = self
            .backend
            .update_task(id, &TaskChanges::default().completed(desired))
            .await;
        let mut st = self.state();
        match result {
            Ok(canonical) => {
                write.commit(&mut st.mirror, canonical.clone());
                Ok(canonical)
            }
            Err(e) => {
                write.rollback(&mut st.mirror);
                Err(e)
            }
        }
    }

    /// Enter edit mode for `id`, seeding the draft with the current title.
    /// Any edit already in progress is implicitly cancelled, unsaved.
    pub fn start_edit(&self, id: &TaskId) -> DomainResult<()> {
        let mut st = self.state();
        let task = st
            .mirror
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("task {}", id)))?;
        st.editing = Some(EditState {
            id: task.id,
            draft: task.title,
        });
        Ok(())
    }

    /// Update the draft text of the edit in progress
    pub fn set_edit_text(&self, text: &str) {
        if let Some(edit) = self.state().editing.as_mut() {
            edit.draft = text.to_string();
        }
    }

    /// Leave edit mode, discarding the draft. No remote call.
    pub fn cancel_edit(&self) {
        self.state().editing = None;
    }

    /// Persist the edit in progress.
    ///
    /// A draft that trims to empty is treated as cancel: edit mode ends
    /// and no request is sent. On failure the edit stays open so the user
    /// can retry; only a confirmed rename touches the mirror, and only
    /// the matching entry.
    pub async fn save_edit(&self) -> DomainResult<Option<Task>> {
        let (id, draft) = match self.state().editing.clone() {
            Some(edit) => (edit.id, edit.draft),
            None => return Ok(None),
        };
        let title = match normalized_title(&draft) {
            Some(t) => t,
            None => {
                self.state().editing = None;
                return Ok(None);
            }
        };

        let gate = self.gate(&id);
        let outcome = {
            let _serial = gate.lock().await;
            self.rename_serialized(&id, &title).await
        };
        drop(gate);
        self.release_gate(&id);
        outcome
    }

    async fn rename_serialized(&self, id: &TaskId, title: &str) -> DomainResult<Option<Task>> {
        let write = {
            let st = self.state();
            match OptimisticWrite::for_existing(&st.mirror, id) {
                Ok(w) => w,
                Err(e) => {
                    // The task vanished under the edit; nothing to save
                    drop(st);
                    self.state().editing = None;
                    return Err(e);
                }
            }
        };

        let result = self
            .backend
            .update_task(id, &TaskChanges::default().title(title))
            .await;
        let mut st = self.state();
        match result {
            Ok(canonical) => {
                write.commit(&mut st.mirror, canonical.clone());
                if st.editing.as_ref().map(|e| &e.id) == Some(id) {
                    st.editing = None;
                }
                Ok(Some(canonical))
            }
            Err(e) => {
                log::warn!("rename failed, staying in edit mode: {}", e);
                Err(e)
            }
        }
    }

    /// Delete a task. Nothing is removed optimistically; the entry leaves
    /// the mirror only once the server confirms, and a failure changes
    /// nothing. Deleting the task being edited also ends the edit.
    pub async fn delete_task(&self, id: &TaskId) -> DomainResult<()> {
        let gate = self.gate(id);
        let outcome = {
            let _serial = gate.lock().await;
            self.delete_serialized(id).await
        };
        drop(gate);
        self.release_gate(id);
        outcome
    }

    async fn delete_serialized(&self, id: &TaskId) -> DomainResult<()> {
        let write = {
            let st = self.state();
            OptimisticWrite::for_existing(&st.mirror, id)?
        };

        match self.backend.delete_task(id).await {
            Ok(()) => {
                let mut st = self.state();
                write.commit_removal(&mut st.mirror);
                if st.editing.as_ref().map(|e| &e.id) == Some(id) {
                    st.editing = None;
                }
                Ok(())
            }
            Err(e) => {
                log::warn!("delete failed: {}", e);
                Err(e)
            }
        }
    }
}
