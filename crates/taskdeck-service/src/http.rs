use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taskdeck_core::project::{CreateProject, Project};
use taskdeck_core::session::{AuthSession, AuthUser, SignUpOutcome};
use taskdeck_core::task::{CreateTask, Task, UpdateTask};

use crate::{AuthService, BackendConfig, ServiceError, TableQuery, TaskService};

const OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// Async HTTP client for a Supabase-style backend (`/auth/v1` + `/rest/v1`).
///
/// Row requests carry the caller's access token; the anon key is always sent as `apikey`.
#[derive(Debug, Clone)]
pub struct HttpService {
    config: BackendConfig,
    client: Client,
}

impl HttpService {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn with_auth(&self, builder: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let builder = match self.config.anon_key() {
            Some(key) => builder.header("apikey", key),
            None => builder,
        };
        match access_token.or(self.config.anon_key()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if the backend is reachable.
    /// Health endpoint is NOT authenticated.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        let resp = self
            .client
            .get(self.config.auth_url("/health"))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::Internal(format!(
                "health check failed: {}",
                resp.status()
            )))
        }
    }

    // -- Generic table access --

    pub async fn select<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        query: &TableQuery,
    ) -> Result<Vec<T>, ServiceError> {
        tracing::debug!(table = query.table(), "select");
        let builder = self
            .client
            .get(self.config.rest_url(query.table()))
            .query(&query.to_query_pairs());
        let resp = send(self.with_auth(builder, Some(&session.access_token))).await?;
        handle_response(resp).await
    }

    /// Select exactly one row. Zero (or several) matching rows is `NotFound`.
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        query: &TableQuery,
    ) -> Result<T, ServiceError> {
        tracing::debug!(table = query.table(), "select single");
        let builder = self
            .client
            .get(self.config.rest_url(query.table()))
            .query(&query.to_query_pairs())
            .header("Accept", OBJECT_MEDIA_TYPE);
        let resp = send(self.with_auth(builder, Some(&session.access_token))).await?;
        handle_response(resp).await
    }

    /// Insert one row and return it as stored (with backend-assigned columns).
    pub async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        table: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        tracing::debug!(table, "insert");
        let builder = self
            .client
            .post(self.config.rest_url(table))
            .header("Prefer", "return=representation")
            .json(body);
        let resp = send(self.with_auth(builder, Some(&session.access_token))).await?;
        let rows: Vec<T> = handle_response(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal(format!("insert into {table} returned no rows")))
    }

    /// Apply a partial update to every row the query matches and return them.
    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        query: &TableQuery,
        body: &B,
    ) -> Result<Vec<T>, ServiceError> {
        tracing::debug!(table = query.table(), "update");
        let builder = self
            .client
            .patch(self.config.rest_url(query.table()))
            .query(&query.to_query_pairs())
            .header("Prefer", "return=representation")
            .json(body);
        let resp = send(self.with_auth(builder, Some(&session.access_token))).await?;
        handle_response(resp).await
    }

    // -- Auth convenience methods (not on trait) --

    /// Fetch the user behind an access token.
    pub async fn current_user(&self, access_token: &str) -> Result<AuthUser, ServiceError> {
        let builder = self.client.get(self.config.auth_url("/user"));
        let resp = send(self.with_auth(builder, Some(access_token))).await?;
        let user: RemoteUser = handle_response(resp).await?;
        Ok(user.into())
    }

    async fn send_auth(&self, builder: RequestBuilder) -> Result<AuthResponse, ServiceError> {
        let resp = send(self.with_auth(builder, None)).await?;
        handle_response(resp).await
    }
}

async fn send(builder: RequestBuilder) -> Result<reqwest::Response, ServiceError> {
    builder
        .send()
        .await
        .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(parse_error(status, &body))
    }
}

/// Map a failed response to a `ServiceError`, keeping the backend's own wording.
///
/// PostgREST reports `message`, the auth API uses `msg` or `error_description`.
fn parse_error(status: StatusCode, body: &str) -> ServiceError {
    let value = serde_json::from_str::<serde_json::Value>(body).ok();
    let msg = value
        .as_ref()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| v[*key].as_str().map(String::from))
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        });
    let code = value
        .as_ref()
        .and_then(|v| v["code"].as_str().map(String::from));

    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(msg),
        StatusCode::NOT_ACCEPTABLE if code.as_deref() == Some("PGRST116") => {
            ServiceError::NotFound(msg)
        }
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::InvalidInput(msg)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized(msg),
        _ => ServiceError::Internal(msg),
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<RemoteUser>,
}

impl AuthResponse {
    /// `Ok(None)` when the backend answered without issuing tokens
    /// (sign-up awaiting email confirmation).
    fn into_session(self) -> Result<Option<AuthSession>, ServiceError> {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|secs| Utc::now().timestamp().saturating_add(secs))
        });
        match (self.access_token, self.refresh_token, expires_at, self.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user: user.into(),
                }))
            }
            (None, None, _, _) => Ok(None),
            _ => Err(ServiceError::Internal(
                "auth response did not include enough session fields".into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl From<RemoteUser> for AuthUser {
    fn from(value: RemoteUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.user_metadata["name"].as_str().map(String::from),
        }
    }
}

#[async_trait]
impl AuthService for HttpService {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let builder = self
            .client
            .post(self.config.auth_url("/token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        self.send_auth(builder).await?.into_session()?.ok_or_else(|| {
            ServiceError::Internal("sign-in response did not include an active session".into())
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, ServiceError> {
        let builder = self
            .client
            .post(self.config.auth_url("/signup"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "name": name },
            }));
        match self.send_auth(builder).await?.into_session()? {
            Some(session) => Ok(SignUpOutcome::SignedIn(session)),
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ServiceError> {
        if refresh_token.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "refresh token must not be empty".into(),
            ));
        }
        let builder = self
            .client
            .post(self.config.auth_url("/token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        self.send_auth(builder).await?.into_session()?.ok_or_else(|| {
            ServiceError::Internal("refresh response did not include an active session".into())
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ServiceError> {
        let builder = self.client.post(self.config.auth_url("/logout"));
        let resp = send(self.with_auth(builder, Some(access_token))).await?;
        let status = resp.status();
        // An already-revoked token counts as signed out.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(parse_error(status, &body))
        }
    }
}

#[async_trait]
impl TaskService for HttpService {
    async fn list_projects(&self, session: &AuthSession) -> Result<Vec<Project>, ServiceError> {
        let query = TableQuery::from("projects")
            .eq("user_id", session.user_id())
            .order_desc("created_at");
        self.select(session, &query).await
    }

    async fn get_project(
        &self,
        session: &AuthSession,
        id: &str,
    ) -> Result<Project, ServiceError> {
        let query = TableQuery::from("projects")
            .eq("id", id)
            .eq("user_id", session.user_id());
        self.select_single(session, &query).await
    }

    async fn create_project(
        &self,
        session: &AuthSession,
        input: &CreateProject,
    ) -> Result<Project, ServiceError> {
        self.insert(session, "projects", input).await
    }

    async fn list_tasks(
        &self,
        session: &AuthSession,
        project_id: &str,
    ) -> Result<Vec<Task>, ServiceError> {
        let query = TableQuery::from("tasks")
            .eq("project_id", project_id)
            .order_desc("created_at");
        self.select(session, &query).await
    }

    async fn create_task(
        &self,
        session: &AuthSession,
        input: &CreateTask,
    ) -> Result<Task, ServiceError> {
        self.insert(session, "tasks", input).await
    }

    async fn update_task(
        &self,
        session: &AuthSession,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError> {
        let query = TableQuery::from("tasks").eq("id", id);
        let rows: Vec<Task> = self.update(session, &query, update).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("task {id} not found")))
    }
}
