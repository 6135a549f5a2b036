//! Application Context
//!
//! [`TaskApp`] is the explicit context object the UI layer drives: it owns
//! the Local State Mirror, the edit-mode state, the owner scope, and the
//! backend handle. Handlers live in `task_cmd` (mirror mutations) and
//! `auth_cmd` (session flows), organized by domain.

mod auth_cmd;
mod task_cmd;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::backend::TaskBackend;
use crate::domain::{Session, Task, TaskId, UserId};
use crate::sessions::{SessionHub, Subscription};
use crate::store::TaskMirror;

/// The one task currently being edited, with its unsaved draft text.
///
/// The draft lives here, not in the mirror; the mirror entry only changes
/// once the remote store confirms the rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState {
    pub id: TaskId,
    pub draft: String,
}

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) mirror: TaskMirror,
    pub(crate) editing: Option<EditState>,
    /// Owner the mirror is scoped to; loads completing for any other owner
    /// are discarded
    pub(crate) owner: Option<UserId>,
}

/// Rescope the app to a new session: drop the draft, empty the mirror.
/// Tasks for the new owner are re-fetched, never merged.
pub(crate) fn rescope(state: &mut AppState, session: Option<&Session>) {
    state.editing = None;
    state.mirror.clear();
    state.owner = session.map(|s| s.user_id.clone());
}

/// Application context shared between the UI layer and the handlers
pub struct TaskApp<B> {
    pub(crate) backend: Arc<B>,
    sessions: Arc<SessionHub>,
    pub(crate) state: Arc<Mutex<AppState>>,
    gates: Arc<Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<B> Clone for TaskApp<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            sessions: Arc::clone(&self.sessions),
            state: Arc::clone(&self.state),
            gates: Arc::clone(&self.gates),
        }
    }
}

impl<B> TaskApp<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            sessions: SessionHub::new(),
            state: Arc::new(Mutex::new(AppState::default())),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionHub> {
        &self.sessions
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().expect("app state lock poisoned")
    }

    /// Current mirror contents, in render order
    pub fn tasks(&self) -> Vec<Task> {
        self.state().mirror.tasks().to_vec()
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state().mirror.get(id).cloned()
    }

    /// The task currently in edit mode, if any
    pub fn editing(&self) -> Option<EditState> {
        self.state().editing.clone()
    }

    /// Owner the mirror is currently scoped to
    pub fn owner(&self) -> Option<UserId> {
        self.state().owner.clone()
    }

    /// Per-id gate serializing overlapping mutations of the same task
    pub(crate) fn gate(&self, id: &TaskId) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().expect("gate lock poisoned");
        Arc::clone(gates.entry(id.clone()).or_default())
    }

    pub(crate) fn release_gate(&self, id: &TaskId) {
        let mut gates = self.gates.lock().expect("gate lock poisoned");
        if let Some(gate) = gates.get(id) {
            if Arc::strong_count(gate) == 1 {
                gates.remove(id);
            }
        }
    }
}

impl<B> TaskApp<B>
where
    B: TaskBackend + Send + Sync + 'static,
{
    /// React to session transitions: rescope synchronously inside the
    /// listener, then reload the mirror for the new owner from a spawned
    /// task. The watch stops when the returned subscription is dropped.
    pub fn watch_sessions(&self) -> Subscription {
        let (tx, mut rx) = mpsc::unbounded_channel::<Option<UserId>>();
        let state = Arc::clone(&self.state);
        let subscription = self.sessions.subscribe(move |session| {
            let mut st = state.lock().expect("app state lock poisoned");
            rescope(&mut st, session);
            let _ = tx.send(st.owner.clone());
        });

        let app = self.clone();
        tokio::spawn(async move {
            while let Some(owner) = rx.recv().await {
                if let Some(owner) = owner {
                    if let Err(e) = app.load_tasks(&owner).await {
                        log::warn!("reload after session change failed: {}", e);
                    }
                }
            }
        });
        subscription
    }

    /// One-shot variant of the session reaction: rescope to the current
    /// session and load its tasks. Useful at startup and in tests where
    /// the spawned reload of [`watch_sessions`](Self::watch_sessions)
    /// would be nondeterministic.
    pub async fn sync_to_session(&self) -> crate::domain::DomainResult<()> {
        let session = self.sessions.current();
        {
            let mut st = self.state();
            rescope(&mut st, session.as_ref());
        }
        if let Some(session) = session {
            self.load_tasks(&session.user_id).await?;
        }
        Ok(())
    }
}
