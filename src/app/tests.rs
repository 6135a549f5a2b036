//! Handler Integration Tests
//!
//! Runs the reconciliation handlers against the in-memory backend, with
//! failure injection for the rollback paths.

use std::sync::Arc;

use crate::app::TaskApp;
use crate::backend::{MemoryBackend, TaskOp};
use crate::domain::{DomainError, SessionKind, UserId};

async fn signed_in_app() -> (TaskApp<MemoryBackend>, Arc<MemoryBackend>, UserId) {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("u1@example.com", "pw");
    let app = TaskApp::new(Arc::clone(&backend));
    let session = app
        .sign_in_with_password("u1@example.com", "pw")
        .await
        .expect("sign in failed");
    app.sync_to_session().await.expect("initial load failed");
    (app, backend, session.user_id)
}

// ========================
// Create
// ========================

#[tokio::test]
async fn test_create_inserts_confirmed_row() {
    let (app, _backend, owner) = signed_in_app().await;

    let created = app
        .add_task("buy milk")
        .await
        .expect("create failed")
        .expect("blank input treated as no-op");

    assert!(!created.id.is_empty());
    let tasks = app.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "buy milk");
    assert!(!tasks[0].completed);
    assert_eq!(tasks[0].owner, owner);
}

#[tokio::test]
async fn test_create_trims_title() {
    let (app, _backend, _owner) = signed_in_app().await;
    let created = app.add_task("  buy milk  ").await.unwrap().unwrap();
    assert_eq!(created.title, "buy milk");
}

#[tokio::test]
async fn test_create_noop_on_blank_input() {
    let (app, backend, _owner) = signed_in_app().await;

    assert_eq!(app.add_task("").await, Ok(None));
    assert_eq!(app.add_task("   ").await, Ok(None));

    assert_eq!(backend.calls(TaskOp::Create), 0);
    assert!(app.tasks().is_empty());
}

#[tokio::test]
async fn test_create_requires_session() {
    let backend = Arc::new(MemoryBackend::new());
    let app = TaskApp::new(Arc::clone(&backend));

    let result = app.add_task("x").await;
    assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    assert_eq!(backend.calls(TaskOp::Create), 0);
}

#[tokio::test]
async fn test_create_failure_leaves_mirror_unchanged() {
    let (app, backend, _owner) = signed_in_app().await;
    backend.fail_next(TaskOp::Create, "insert rejected");

    let result = app.add_task("doomed").await;
    assert_eq!(result, Err(DomainError::Backend("insert rejected".to_string())));
    assert!(app.tasks().is_empty());
}

// ========================
// Toggle
// ========================

#[tokio::test]
async fn test_toggle_reconciles_with_server_echo() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();

    let toggled = app.toggle_task(&seeded.id).await.expect("toggle failed");
    assert!(toggled.completed);
    assert!(app.task(&seeded.id).unwrap().completed);
}

#[tokio::test]
async fn test_toggle_twice_is_idempotent() {
    let (app, backend, owner) = signed_in_app().await;
    backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();
    let original = app.tasks()[0].clone();

    app.toggle_task(&original.id).await.expect("first toggle");
    app.toggle_task(&original.id).await.expect("second toggle");

    assert_eq!(app.task(&original.id).unwrap(), original);
}

#[tokio::test]
async fn test_toggle_failure_rolls_back_entry_exactly() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();
    let before = app.task(&seeded.id).unwrap();

    backend.fail_next(TaskOp::Update, "boom");
    let result = app.toggle_task(&seeded.id).await;

    assert_eq!(result, Err(DomainError::Backend("boom".to_string())));
    assert_eq!(app.task(&seeded.id).unwrap(), before);
    assert_eq!(backend.calls(TaskOp::Update), 1);
}

#[tokio::test]
async fn test_toggle_unknown_id_is_rejected_locally() {
    let (app, backend, _owner) = signed_in_app().await;

    let result = app.toggle_task(&"999".to_string()).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    assert_eq!(backend.calls(TaskOp::Update), 0);
}

#[tokio::test]
async fn test_overlapping_same_task_toggles_serialize() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();

    let (a, b) = tokio::join!(app.toggle_task(&seeded.id), app.toggle_task(&seeded.id));
    a.expect("first toggle");
    b.expect("second toggle");

    // Two flips land in order, returning the flag to its original value
    assert!(!app.task(&seeded.id).unwrap().completed);
    assert_eq!(backend.calls(TaskOp::Update), 2);
}

// ========================
// Rename
// ========================

#[tokio::test]
async fn test_rename_replaces_entry_and_exits_edit_mode() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "old", false);
    app.sync_to_session().await.unwrap();

    app.start_edit(&seeded.id).expect("start edit");
    assert_eq!(app.editing().unwrap().draft, "old");
    app.set_edit_text("new title");

    let saved = app.save_edit().await.expect("save failed").expect("was editing");
    assert_eq!(saved.title, "new title");
    assert_eq!(app.task(&seeded.id).unwrap().title, "new title");
    assert!(app.editing().is_none());
}

#[tokio::test]
async fn test_rename_blank_draft_is_cancel() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();

    app.start_edit(&seeded.id).unwrap();
    app.set_edit_text("   ");

    assert_eq!(app.save_edit().await, Ok(None));
    assert!(app.editing().is_none());
    assert_eq!(app.task(&seeded.id).unwrap().title, "x");
    assert_eq!(backend.calls(TaskOp::Update), 0);
}

#[tokio::test]
async fn test_rename_failure_stays_in_edit_mode() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "old", false);
    app.sync_to_session().await.unwrap();

    app.start_edit(&seeded.id).unwrap();
    app.set_edit_text("new");
    backend.fail_next(TaskOp::Update, "rename rejected");

    let result = app.save_edit().await;
    assert!(matches!(result, Err(DomainError::Backend(_))));

    // Draft survives for retry; the mirror never saw the new title
    let editing = app.editing().expect("still editing");
    assert_eq!(editing.draft, "new");
    assert_eq!(app.task(&seeded.id).unwrap().title, "old");

    let saved = app.save_edit().await.expect("retry failed");
    assert_eq!(saved.unwrap().title, "new");
    assert!(app.editing().is_none());
}

#[tokio::test]
async fn test_rename_touches_only_matching_entry() {
    let (app, backend, owner) = signed_in_app().await;
    let first = backend.seed_task(&owner, "first", false);
    let second = backend.seed_task(&owner, "second", true);
    app.sync_to_session().await.unwrap();

    app.start_edit(&first.id).unwrap();
    app.set_edit_text("renamed");
    app.save_edit().await.expect("save failed");

    assert_eq!(app.task(&first.id).unwrap().title, "renamed");
    let untouched = app.task(&second.id).unwrap();
    assert_eq!(untouched.title, "second");
    assert!(untouched.completed);
}

#[tokio::test]
async fn test_edit_exclusivity() {
    let (app, backend, owner) = signed_in_app().await;
    let a = backend.seed_task(&owner, "a", false);
    let b = backend.seed_task(&owner, "b", false);
    app.sync_to_session().await.unwrap();

    app.start_edit(&a.id).unwrap();
    app.set_edit_text("half-typed");
    app.start_edit(&b.id).unwrap();

    // A's draft is discarded without persisting; its entry is untouched
    let editing = app.editing().unwrap();
    assert_eq!(editing.id, b.id);
    assert_eq!(editing.draft, "b");
    assert_eq!(app.task(&a.id).unwrap().title, "a");
    assert_eq!(backend.calls(TaskOp::Update), 0);
}

#[tokio::test]
async fn test_cancel_edit_discards_draft() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();

    app.start_edit(&seeded.id).unwrap();
    app.set_edit_text("discarded");
    app.cancel_edit();

    assert!(app.editing().is_none());
    assert_eq!(app.task(&seeded.id).unwrap().title, "x");
    assert_eq!(backend.calls(TaskOp::Update), 0);
}

// ========================
// Delete
// ========================

#[tokio::test]
async fn test_delete_removes_entry_and_clears_edit() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();

    app.start_edit(&seeded.id).unwrap();
    app.delete_task(&seeded.id).await.expect("delete failed");

    assert!(app.task(&seeded.id).is_none());
    assert!(app.editing().is_none());
}

#[tokio::test]
async fn test_delete_failure_leaves_mirror_unchanged() {
    let (app, backend, owner) = signed_in_app().await;
    let seeded = backend.seed_task(&owner, "x", false);
    app.sync_to_session().await.unwrap();

    backend.fail_next(TaskOp::Delete, "delete rejected");
    let result = app.delete_task(&seeded.id).await;

    assert!(matches!(result, Err(DomainError::Backend(_))));
    assert_eq!(app.task(&seeded.id).unwrap(), seeded);
}

#[tokio::test]
async fn test_delete_unknown_id_is_rejected_locally() {
    let (app, backend, _owner) = signed_in_app().await;

    let result = app.delete_task(&"999".to_string()).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    assert_eq!(backend.calls(TaskOp::Delete), 0);
}

// ========================
// Sessions and owner scoping
// ========================

#[tokio::test]
async fn test_stale_load_for_other_owner_is_discarded() {
    let (app, backend, owner) = signed_in_app().await;
    backend.seed_task(&owner, "mine", false);
    let other = backend.with_user("u2@example.com", "pw");
    backend.seed_task(&other, "theirs", false);
    app.sync_to_session().await.unwrap();

    // Resolves after the app was scoped to u1, so its rows are dropped
    app.load_tasks(&other).await.expect("load failed");

    let tasks = app.tasks();
    assert_eq!(tasks.len(), 1);
    assert!(tasks.iter().all(|t| t.owner == owner));
}

#[tokio::test]
async fn test_session_change_refetches_instead_of_merging() {
    let (app, backend, owner) = signed_in_app().await;
    backend.seed_task(&owner, "mine", false);
    app.sync_to_session().await.unwrap();
    assert_eq!(app.tasks().len(), 1);

    app.sign_out().await.expect("sign out failed");
    app.sync_to_session().await.unwrap();
    assert!(app.tasks().is_empty());
    assert!(app.owner().is_none());

    let other = backend.with_user("u2@example.com", "pw");
    backend.seed_task(&other, "theirs", false);
    app.sign_in_with_password("u2@example.com", "pw").await.unwrap();
    app.sync_to_session().await.unwrap();

    let tasks = app.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "theirs");
}

#[tokio::test]
async fn test_watch_sessions_reloads_on_transition() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = backend.with_user("u1@example.com", "pw");
    backend.seed_task(&owner, "mine", false);
    let app = TaskApp::new(Arc::clone(&backend));
    let _watch = app.watch_sessions();

    app.sign_in_with_password("u1@example.com", "pw")
        .await
        .expect("sign in failed");
    // Rescope runs synchronously in the listener
    assert_eq!(app.owner(), Some(owner.clone()));

    // The reload runs on a spawned task; give it a few turns
    for _ in 0..100 {
        if !app.tasks().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(app.tasks().len(), 1);

    app.sign_out().await.unwrap();
    assert!(app.tasks().is_empty());
    assert!(app.owner().is_none());
}

#[tokio::test]
async fn test_magic_link_session_arrives_out_of_band() {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("u1@example.com", "pw");
    let app = TaskApp::new(Arc::clone(&backend));

    app.sign_in_with_magic_link("u1@example.com", "https://app/callback")
        .await
        .expect("request failed");
    assert!(app.sessions().current().is_none());

    backend.complete_magic_link("u1@example.com").unwrap();
    let session = app.resume_session().await.expect("resume failed");
    assert_eq!(
        session.map(|s| s.kind),
        Some(SessionKind::Standard)
    );
    app.sync_to_session().await.unwrap();
    assert!(app.owner().is_some());
}

#[tokio::test]
async fn test_update_password_requires_recovery_session() {
    let (app, backend, _owner) = signed_in_app().await;

    let result = app.update_password("new").await;
    assert!(matches!(result, Err(DomainError::Unauthorized(_))));

    backend.begin_recovery("u1@example.com").unwrap();
    app.resume_session().await.unwrap();
    app.update_password("new").await.expect("update failed");
}

#[tokio::test]
async fn test_update_password_without_session() {
    let backend = Arc::new(MemoryBackend::new());
    let app = TaskApp::new(backend);
    let result = app.update_password("new").await;
    assert!(matches!(result, Err(DomainError::Unauthorized(_))));
}
