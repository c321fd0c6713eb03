pub mod auth;
pub mod health;
pub mod rest;

use std::sync::{Arc, Mutex};

use axum::{middleware, Router};
use tower_http::cors::CorsLayer;

use crate::auth::{api_key_middleware, AccountStore};
use crate::store::TableStore;

pub struct InnerAppState {
    /// When set, every non-health request must carry it in the `apikey` header.
    pub anon_key: Option<String>,
    pub accounts: Mutex<AccountStore>,
    pub tables: Mutex<TableStore>,
}

pub type AppState = Arc<InnerAppState>;

impl InnerAppState {
    pub fn new(anon_key: Option<String>) -> AppState {
        Arc::new(Self {
            anon_key: anon_key.filter(|k| !k.trim().is_empty()),
            accounts: Mutex::new(AccountStore::new()),
            tables: Mutex::new(TableStore::new()),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new().merge(health::routes());

    let protected = Router::new()
        .merge(auth::routes())
        .merge(rest::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    public
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
