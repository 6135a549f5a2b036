//! HTTP Backend
//!
//! Supabase-style implementation of [`AuthBackend`] and [`TaskBackend`]:
//! GoTrue endpoints under `/auth/v1` and PostgREST row access under
//! `/rest/v1/tasks`. Row-level security on the server enforces owner
//! isolation; this client additionally scopes every list query by owner.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, Session, SessionKind, Task, TaskChanges, TaskId, UserId};

use super::traits::{AuthBackend, TaskBackend};

/// Connection settings for the hosted backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub base_url: String,
    /// Public (anon) API key, sent with every request
    pub api_key: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
        }
    }
}

struct StoredCredential {
    access_token: String,
    kind: SessionKind,
}

/// Remote backend over HTTP
pub struct HttpBackend {
    http: reqwest::Client,
    config: BackendConfig,
    credential: Mutex<Option<StoredCredential>>,
}

// ========================
// Wire Types
// ========================

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct OtpBody<'a> {
    email: &'a str,
    create_user: bool,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct PasswordBody<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Serialize)]
struct NewTaskRow<'a> {
    title: &'a str,
    owner: &'a str,
    completed: bool,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            credential: Mutex::new(None),
        }
    }

    /// Adopt an access token obtained out of band (magic-link or recovery
    /// callback). Fetches the user behind the token and stores it as the
    /// current credential.
    pub async fn adopt_access_token(
        &self,
        access_token: &str,
        kind: SessionKind,
    ) -> DomainResult<Session> {
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;
        let user: AuthUser = Self::read_json(response).await?;

        self.store_credential(access_token.to_string(), kind);
        let session = match kind {
            SessionKind::Standard => Session::new(user.id, user.email),
            SessionKind::Recovery => Session::recovery(user.id, user.email),
        };
        Ok(session)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/tasks", self.config.base_url)
    }

    fn store_credential(&self, access_token: String, kind: SessionKind) {
        let mut slot = self.credential.lock().expect("credential lock poisoned");
        *slot = Some(StoredCredential { access_token, kind });
    }

    fn clear_credential(&self) {
        let mut slot = self.credential.lock().expect("credential lock poisoned");
        *slot = None;
    }

    fn credential(&self) -> Option<(String, SessionKind)> {
        let slot = self.credential.lock().expect("credential lock poisoned");
        slot.as_ref().map(|c| (c.access_token.clone(), c.kind))
    }

    /// Attach the api key and, when held, the bearer token
    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("apikey", &self.config.api_key);
        match self.credential() {
            Some((token, _)) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> DomainResult<T> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DomainError::Backend(format!("malformed response: {}", e)))
    }

    async fn check_status(response: Response) -> DomainResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

/// Pull the human-readable message out of a GoTrue/PostgREST error body
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    if body.is_empty() {
        "request failed".to_string()
    } else {
        body.to_string()
    }
}

fn status_error(status: StatusCode, body: &str) -> DomainError {
    let msg = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DomainError::Unauthorized(msg),
        StatusCode::NOT_FOUND => DomainError::NotFound(msg),
        StatusCode::CONFLICT => DomainError::Conflict(msg),
        _ => DomainError::Backend(format!("{}: {}", status.as_u16(), msg)),
    }
}

fn transport_error(e: reqwest::Error) -> DomainError {
    DomainError::Backend(e.to_string())
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn sign_up(&self, email: &str, password: &str) -> DomainResult<()> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.config.api_key)
            .json(&CredentialsBody { email, password })
            .send()
            .await
            .map_err(transport_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> DomainResult<Session> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.api_key)
            .json(&CredentialsBody { email, password })
            .send()
            .await
            .map_err(transport_error)?;
        let token: TokenResponse = Self::read_json(response).await?;

        self.store_credential(token.access_token, SessionKind::Standard);
        Ok(Session::new(token.user.id, token.user.email))
    }

    async fn sign_in_with_magic_link(&self, email: &str, redirect: &str) -> DomainResult<()> {
        let response = self
            .http
            .post(self.auth_url("otp"))
            .query(&[("redirect_to", redirect)])
            .header("apikey", &self.config.api_key)
            .json(&OtpBody {
                email,
                create_user: true,
            })
            .send()
            .await
            .map_err(transport_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect: &str) -> DomainResult<()> {
        let response = self
            .http
            .post(self.auth_url("recover"))
            .query(&[("redirect_to", redirect)])
            .header("apikey", &self.config.api_key)
            .json(&EmailBody { email })
            .send()
            .await
            .map_err(transport_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> DomainResult<()> {
        if self.credential().is_none() {
            return Err(DomainError::Unauthorized("no active session".to_string()));
        }
        let response = self
            .authed(self.http.put(self.auth_url("user")))
            .json(&PasswordBody {
                password: new_password,
            })
            .send()
            .await
            .map_err(transport_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn sign_out(&self) -> DomainResult<()> {
        let held = self.credential().is_some();
        if held {
            let response = self
                .authed(self.http.post(self.auth_url("logout")))
                .send()
                .await
                .map_err(transport_error)?;
            // A dead token is as signed-out as it gets
            if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                self.clear_credential();
                return Err(status_error(status, &body));
            }
        }
        self.clear_credential();
        Ok(())
    }

    async fn current_session(&self) -> DomainResult<Option<Session>> {
        let (token, kind) = match self.credential() {
            Some(c) => c,
            None => return Ok(None),
        };
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // Credential expired; drop it
            self.clear_credential();
            return Ok(None);
        }
        let user: AuthUser = Self::read_json(response).await?;
        let session = match kind {
            SessionKind::Standard => Session::new(user.id, user.email),
            SessionKind::Recovery => Session::recovery(user.id, user.email),
        };
        Ok(Some(session))
    }
}

#[async_trait]
impl TaskBackend for HttpBackend {
    async fn list_tasks(&self, owner: &UserId) -> DomainResult<Vec<Task>> {
        let owner_filter = format!("eq.{}", owner);
        let response = self
            .authed(self.http.get(self.rest_url()))
            .query(&[
                ("select", "id,title,completed,owner,created_at"),
                ("owner", owner_filter.as_str()),
                ("order", "created_at.asc"),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_json(response).await
    }

    async fn create_task(&self, title: &str, owner: &UserId) -> DomainResult<Task> {
        let response = self
            .authed(self.http.post(self.rest_url()))
            .header("Prefer", "return=representation")
            .json(&NewTaskRow {
                title,
                owner,
                completed: false,
            })
            .send()
            .await
            .map_err(transport_error)?;
        let mut rows: Vec<Task> = Self::read_json(response).await?;
        rows.pop()
            .ok_or_else(|| DomainError::Backend("insert returned no row".to_string()))
    }

    async fn update_task(&self, id: &TaskId, changes: &TaskChanges) -> DomainResult<Task> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .authed(self.http.patch(self.rest_url()))
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .json(changes)
            .send()
            .await
            .map_err(transport_error)?;
        let mut rows: Vec<Task> = Self::read_json(response).await?;
        rows.pop()
            .ok_or_else(|| DomainError::NotFound(format!("task {}", id)))
    }

    async fn delete_task(&self, id: &TaskId) -> DomainResult<()> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .authed(self.http.delete(self.rest_url()))
            .query(&[("id", id_filter.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        Self::check_status(response).await?;
        Ok(())
    }
}
