use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use taskdeck_service::TableQuery;

use super::AppState;
use crate::auth::bearer_token;
use crate::store::{Row, StoreError};

const OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/rest/v1/{table}",
        get(select_rows).post(insert_rows).patch(update_rows),
    )
}

type RestError = (StatusCode, Json<Value>);

async fn select_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, RestError> {
    let user = caller(&state, &headers)?;
    let query = parse_query(&table, &params)?;
    let rows = state
        .tables
        .lock()
        .map_err(lock_error)?
        .select(user.as_deref(), &query)
        .map_err(to_error)?;

    if wants_object(&headers) {
        return single_row(rows).map(|row| Json(Value::Object(row)).into_response());
    }
    Ok(Json(rows).into_response())
}

async fn insert_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, RestError> {
    let user = caller(&state, &headers)?;
    let rows = match body {
        Value::Object(row) => vec![row],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                _ => Err(invalid_body()),
            })
            .collect::<Result<Vec<Row>, _>>()?,
        _ => return Err(invalid_body()),
    };

    let inserted = state
        .tables
        .lock()
        .map_err(lock_error)?
        .insert(user.as_deref(), &table, rows)
        .map_err(to_error)?;
    tracing::info!(table = %table, count = inserted.len(), "insert");

    if wants_representation(&headers) {
        Ok((StatusCode::CREATED, Json(inserted)).into_response())
    } else {
        Ok(StatusCode::CREATED.into_response())
    }
}

async fn update_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, RestError> {
    let user = caller(&state, &headers)?;
    let query = parse_query(&table, &params)?;
    let Value::Object(patch) = body else {
        return Err(invalid_body());
    };

    let updated = state
        .tables
        .lock()
        .map_err(lock_error)?
        .update(user.as_deref(), &query, patch)
        .map_err(to_error)?;
    tracing::info!(table = %table, count = updated.len(), "update");

    if wants_representation(&headers) {
        Ok(Json(updated).into_response())
    } else {
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

/// The signed-in user's id, or `None` for anonymous requests (anon key or no bearer).
/// A bearer that is neither is rejected.
fn caller(state: &AppState, headers: &HeaderMap) -> Result<Option<String>, RestError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    if state.anon_key.as_deref() == Some(token) {
        return Ok(None);
    }
    let accounts = state.accounts.lock().map_err(lock_error)?;
    match accounts.user_for_token(token) {
        Some(user) => Ok(Some(user.id.clone())),
        None => Err(rest_error(
            StatusCode::UNAUTHORIZED,
            "PGRST301",
            "JWT expired or invalid".into(),
        )),
    }
}

fn parse_query(table: &str, params: &[(String, String)]) -> Result<TableQuery, RestError> {
    TableQuery::from_query_pairs(table, params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map_err(|e| rest_error(StatusCode::BAD_REQUEST, "PGRST100", e.message().to_string()))
}

fn wants_object(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(OBJECT_MEDIA_TYPE))
}

fn wants_representation(headers: &HeaderMap) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"))
}

fn single_row(mut rows: Vec<Row>) -> Result<Row, RestError> {
    if rows.len() == 1 {
        return Ok(rows.remove(0));
    }
    Err((
        StatusCode::NOT_ACCEPTABLE,
        Json(json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned",
            "details": format!("The result contains {} rows", rows.len()),
            "hint": null,
        })),
    ))
}

fn to_error(e: StoreError) -> RestError {
    let status = match &e {
        StoreError::UnknownTable(_) => StatusCode::NOT_FOUND,
        StoreError::RowSecurity(_) => StatusCode::FORBIDDEN,
        StoreError::UnknownColumn { .. }
        | StoreError::NotNull { .. }
        | StoreError::InvalidValue { .. } => StatusCode::BAD_REQUEST,
    };
    tracing::debug!(code = e.code(), error = %e, "request rejected");
    rest_error(status, e.code(), e.to_string())
}

fn invalid_body() -> RestError {
    rest_error(
        StatusCode::BAD_REQUEST,
        "PGRST102",
        "Empty or invalid json".into(),
    )
}

fn lock_error<T>(_: T) -> RestError {
    rest_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "XX000",
        "table store unavailable".into(),
    )
}

fn rest_error(status: StatusCode, code: &str, message: String) -> RestError {
    (
        status,
        Json(json!({ "code": code, "message": message, "details": null, "hint": null })),
    )
}
