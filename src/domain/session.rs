//! Session Entity
//!
//! The authenticated identity gating which tasks are loaded and which
//! mutations are permitted.

use serde::{Deserialize, Serialize};

/// Identifier of an authenticated user
pub type UserId = String;

/// How the session was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Regular sign-in (password, magic link, restored credential)
    Standard,
    /// Password-recovery flow; the only kind in which a password update
    /// is permitted
    Recovery,
}

/// An active authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
    pub kind: SessionKind,
}

impl Session {
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self {
            user_id,
            email,
            kind: SessionKind::Standard,
        }
    }

    pub fn recovery(user_id: UserId, email: Option<String>) -> Self {
        Self {
            user_id,
            email,
            kind: SessionKind::Recovery,
        }
    }

    pub fn is_recovery(&self) -> bool {
        self.kind == SessionKind::Recovery
    }
}
