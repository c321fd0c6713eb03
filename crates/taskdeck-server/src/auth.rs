use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use taskdeck_core::credentials::MIN_PASSWORD_LEN;

use crate::routes::AppState;

/// Lifetime of an issued access token, in seconds.
pub const ACCESS_TOKEN_TTL: i64 = 3600;

/// SHA-256 hash a raw string, returning the hex-encoded digest.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generate an opaque token: `prefix` + 43 chars of base62-encoded random bytes.
pub fn generate_token(prefix: &str) -> String {
    use rand::Rng;
    const BASE62: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let random_part: String = (0..43)
        .map(|_| {
            let idx = rng.gen_range(0..BASE62.len());
            BASE62[idx] as char
        })
        .collect();
    format!("{prefix}{random_part}")
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Axum middleware that enforces the project's public API key.
///
/// If no anon key is configured, all requests pass through (open access).
/// Otherwise the `apikey` header must match.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = match &state.anon_key {
        Some(key) => key,
        None => return next.run(request).await,
    };

    let presented = request
        .headers()
        .get("apikey")
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if constant_time_eq(&sha256_hex(key), &sha256_hex(expected)) => {
            next.run(request).await
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "No API key found in request" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: String,
    password_hash: String,
    salt: String,
}

impl User {
    /// The user object as the auth API renders it.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "aud": "authenticated",
            "role": "authenticated",
            "email": self.email,
            "user_metadata": { "name": self.name },
            "created_at": self.created_at,
        })
    }
}

/// A freshly minted token pair.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: User,
}

impl IssuedSession {
    pub fn to_json(&self) -> Value {
        json!({
            "access_token": self.access_token,
            "token_type": "bearer",
            "expires_in": ACCESS_TOKEN_TTL,
            "expires_at": self.expires_at,
            "refresh_token": self.refresh_token,
            "user": self.user.to_json(),
        })
    }
}

/// Failures of the auth API, each with the status and wording clients expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthApiError {
    MissingCredentials,
    InvalidEmail,
    WeakPassword,
    UserAlreadyExists,
    InvalidCredentials,
    InvalidRefreshToken,
    UnsupportedGrant(String),
}

impl AuthApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthApiError::WeakPassword | AuthApiError::UserAlreadyExists => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AuthApiError::MissingCredentials => {
                "Signup requires a valid password and email".into()
            }
            AuthApiError::InvalidEmail => "Unable to validate email address: invalid format".into(),
            AuthApiError::WeakPassword => {
                format!("Password should be at least {MIN_PASSWORD_LEN} characters.")
            }
            AuthApiError::UserAlreadyExists => "User already registered".into(),
            AuthApiError::InvalidCredentials => "Invalid login credentials".into(),
            AuthApiError::InvalidRefreshToken => {
                "Invalid Refresh Token: Refresh Token Not Found".into()
            }
            AuthApiError::UnsupportedGrant(grant) => {
                format!("unsupported_grant_type: {grant}")
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AuthApiError::MissingCredentials => "validation_failed",
            AuthApiError::InvalidEmail => "email_address_invalid",
            AuthApiError::WeakPassword => "weak_password",
            AuthApiError::UserAlreadyExists => "user_already_exists",
            AuthApiError::InvalidCredentials | AuthApiError::InvalidRefreshToken => {
                "invalid_grant"
            }
            AuthApiError::UnsupportedGrant(_) => "unsupported_grant_type",
        }
    }

    pub fn into_response_parts(self) -> (StatusCode, Json<Value>) {
        let status = self.status();
        let body = match self {
            AuthApiError::InvalidCredentials | AuthApiError::InvalidRefreshToken => json!({
                "error": "invalid_grant",
                "error_description": self.message(),
            }),
            _ => json!({
                "code": status.as_u16(),
                "error_code": self.error_code(),
                "msg": self.message(),
            }),
        };
        (status, Json(body))
    }
}

struct AccessGrant {
    user_id: String,
    refresh_token: String,
    expires_at: i64,
}

/// Email/password accounts and the tokens issued for them. In memory only.
#[derive(Default)]
pub struct AccountStore {
    /// Keyed by lowercased email.
    users: HashMap<String, User>,
    access: HashMap<String, AccessGrant>,
    /// refresh token -> user id
    refresh: HashMap<String, String>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account and sign it in immediately (no email confirmation).
    pub fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<IssuedSession, AuthApiError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthApiError::MissingCredentials);
        }
        if !is_plausible_email(email) {
            return Err(AuthApiError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthApiError::WeakPassword);
        }
        let key = email.to_lowercase();
        if self.users.contains_key(&key) {
            return Err(AuthApiError::UserAlreadyExists);
        }

        let salt = generate_token("");
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
            created_at: Utc::now().to_rfc3339(),
            password_hash: sha256_hex(&format!("{salt}{password}")),
            salt,
        };
        tracing::info!(user_id = %user.id, "account created");
        self.users.insert(key, user.clone());
        Ok(self.issue(user))
    }

    pub fn sign_in_password(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthApiError> {
        let user = self
            .users
            .get(&email.trim().to_lowercase())
            .filter(|u| {
                constant_time_eq(
                    &sha256_hex(&format!("{}{password}", u.salt)),
                    &u.password_hash,
                )
            })
            .cloned()
            .ok_or(AuthApiError::InvalidCredentials)?;
        Ok(self.issue(user))
    }

    /// Exchange a refresh token for a new pair. The old refresh token is spent.
    pub fn refresh(&mut self, refresh_token: &str) -> Result<IssuedSession, AuthApiError> {
        let user_id = self
            .refresh
            .remove(refresh_token)
            .ok_or(AuthApiError::InvalidRefreshToken)?;
        self.access.retain(|_, grant| grant.refresh_token != refresh_token);
        let user = self
            .users
            .values()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(AuthApiError::InvalidRefreshToken)?;
        Ok(self.issue(user))
    }

    /// Revoke the access token and its paired refresh token. Unknown tokens are ignored.
    pub fn sign_out(&mut self, access_token: &str) {
        if let Some(grant) = self.access.remove(access_token) {
            self.refresh.remove(&grant.refresh_token);
        }
    }

    /// The user behind an unexpired access token.
    pub fn user_for_token(&self, access_token: &str) -> Option<&User> {
        let grant = self.access.get(access_token)?;
        if grant.expires_at <= Utc::now().timestamp() {
            return None;
        }
        self.users.values().find(|u| u.id == grant.user_id)
    }

    fn issue(&mut self, user: User) -> IssuedSession {
        let access_token = generate_token("at_");
        let refresh_token = generate_token("rt_");
        let expires_at = Utc::now().timestamp() + ACCESS_TOKEN_TTL;
        self.access.insert(
            access_token.clone(),
            AccessGrant {
                user_id: user.id.clone(),
                refresh_token: refresh_token.clone(),
                expires_at,
            },
        );
        self.refresh.insert(refresh_token.clone(), user.id.clone());
        IssuedSession {
            access_token,
            refresh_token,
            expires_at,
            user,
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}
