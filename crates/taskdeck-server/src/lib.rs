pub mod auth;
mod routes;
pub mod store;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use anyhow::Result;
use tokio::net::TcpListener;

pub use routes::{build_router, AppState, InnerAppState};

pub async fn serve(listener: TcpListener, anon_key: Option<String>) -> Result<()> {
    let state = InnerAppState::new(anon_key);
    let app = build_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
