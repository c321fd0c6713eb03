use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::auth::{bearer_token, AuthApiError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/v1/signup", post(sign_up))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/user", get(current_user))
}

type AuthResult<T> = Result<T, (StatusCode, Json<Value>)>;

#[derive(Debug, Deserialize)]
struct SignUpBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    data: Value,
}

async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpBody>,
) -> AuthResult<Json<Value>> {
    let name = body.data.get("name").and_then(Value::as_str);
    let mut accounts = state.accounts.lock().map_err(lock_error)?;
    accounts
        .sign_up(&body.email, &body.password, name)
        .map(|session| Json(session.to_json()))
        .map_err(AuthApiError::into_response_parts)
}

#[derive(Debug, Deserialize)]
struct GrantParams {
    grant_type: String,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    email: Option<String>,
    password: Option<String>,
    refresh_token: Option<String>,
}

async fn token(
    State(state): State<AppState>,
    Query(params): Query<GrantParams>,
    Json(body): Json<TokenBody>,
) -> AuthResult<Json<Value>> {
    let mut accounts = state.accounts.lock().map_err(lock_error)?;
    let issued = match params.grant_type.as_str() {
        "password" => accounts.sign_in_password(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        ),
        "refresh_token" => {
            accounts.refresh(body.refresh_token.as_deref().unwrap_or_default())
        }
        other => Err(AuthApiError::UnsupportedGrant(other.to_string())),
    };
    match issued {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, grant = %params.grant_type, "token issued");
            Ok(Json(session.to_json()))
        }
        Err(e) => {
            tracing::debug!(grant = %params.grant_type, error = %e.message(), "token refused");
            Err(e.into_response_parts())
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AuthResult<StatusCode> {
    let token = bearer_token(&headers).ok_or_else(missing_token)?;
    let mut accounts = state.accounts.lock().map_err(lock_error)?;
    if accounts.user_for_token(token).is_none() {
        return Err(invalid_token());
    }
    accounts.sign_out(token);
    Ok(StatusCode::NO_CONTENT)
}

async fn current_user(State(state): State<AppState>, headers: HeaderMap) -> AuthResult<Json<Value>> {
    let token = bearer_token(&headers).ok_or_else(missing_token)?;
    let accounts = state.accounts.lock().map_err(lock_error)?;
    accounts
        .user_for_token(token)
        .map(|user| Json(user.to_json()))
        .ok_or_else(invalid_token)
}

fn missing_token() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "code": 401, "error_code": "no_authorization", "msg": "This endpoint requires a Bearer token" })),
    )
}

fn invalid_token() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "code": 401, "error_code": "bad_jwt", "msg": "invalid JWT: unable to parse or verify signature" })),
    )
}

fn lock_error<T>(_: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "msg": "account store unavailable" })),
    )
}
