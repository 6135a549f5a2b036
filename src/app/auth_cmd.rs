//! Auth Handlers
//!
//! Session flows delegating to the backend, with every resulting
//! transition routed through the session hub so subscribers (including
//! the mirror reload reaction) observe it.

use crate::backend::AuthBackend;
use crate::domain::{DomainError, DomainResult, Session};

use super::TaskApp;

impl<B> TaskApp<B>
where
    B: AuthBackend + Send + Sync,
{
    /// Register an email/password account. Confirmation happens over
    /// email; no session is established here.
    pub async fn sign_up(&self, email: &str, password: &str) -> DomainResult<()> {
        self.backend.sign_up(email, password).await
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> DomainResult<Session> {
        let session = self.backend.sign_in_with_password(email, password).await?;
        self.sessions().set(Some(session.clone()));
        Ok(session)
    }

    /// Send a magic sign-in link. The session materialises out of band,
    /// once the link lands and [`resume_session`](Self::resume_session)
    /// picks the credential up.
    pub async fn sign_in_with_magic_link(&self, email: &str, redirect: &str) -> DomainResult<()> {
        self.backend.sign_in_with_magic_link(email, redirect).await
    }

    pub async fn request_password_reset(&self, email: &str, redirect: &str) -> DomainResult<()> {
        self.backend.request_password_reset(email, redirect).await
    }

    /// Replace the password. Only valid inside an active recovery
    /// session, the one the reset email establishes.
    pub async fn update_password(&self, new_password: &str) -> DomainResult<()> {
        match self.sessions().current() {
            Some(session) if session.is_recovery() => {
                self.backend.update_password(new_password).await
            }
            Some(_) => Err(DomainError::Unauthorized(
                "password update requires a recovery session".to_string(),
            )),
            None => Err(DomainError::Unauthorized(
                "no active password reset session".to_string(),
            )),
        }
    }

    /// Sign out. The local session ends regardless of whether the remote
    /// call succeeds; in-flight requests are not aborted, their results
    /// land on a mirror that has already been discarded.
    pub async fn sign_out(&self) -> DomainResult<()> {
        let result = self.backend.sign_out().await;
        self.sessions().set(None);
        result
    }

    /// Restore the session behind a persisted credential, if one is
    /// still live. Routes the result through the hub either way, so the
    /// "unknown" startup state resolves to a transition.
    pub async fn resume_session(&self) -> DomainResult<Option<Session>> {
        let session = self.backend.current_session().await?;
        self.sessions().set(session.clone());
        Ok(session)
    }
}
