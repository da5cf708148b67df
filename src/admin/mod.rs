//! Administrative HTTP API.
//!
//! Every request carries `Authorization: Bearer <api_key>`. The key stands
//! for one configured operator address, and that address is the caller
//! for all role checks. Holding the key does not bypass roles: the
//! operator still needs ADMIN, WHITELISTER or LIMIT_MANAGER where the
//! underlying operation requires it.

pub mod auth;
pub mod handlers;

use alloy::primitives::Address;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::{GateService, Shutdown};

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub service: Arc<GateService>,
    pub operator: Address,
    pub api_key: Arc<str>,
}

#[allow(deprecated)]
pub fn setup_admin_router(state: AdminState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/principals/{asset}/{address}", get(get_principal))
        .route("/admin/whitelist", post(post_whitelist))
        .route("/admin/whitelist/toggle", post(post_whitelist_toggle))
        .route("/admin/exemptions", post(post_exemptions))
        .route("/admin/limits/default/{asset}", put(put_default_limits))
        .route(
            "/admin/limits/user/{asset}/{address}",
            put(put_user_limits).delete(delete_user_limits),
        )
        .route("/admin/period/reset/{asset}/{address}", post(post_period_reset))
        .route("/admin/config", put(put_config))
        .route("/admin/pause", post(post_pause))
        .route("/admin/unpause", post(post_unpause))
        .route("/admin/snapshot", post(post_snapshot))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `shutdown` fires.
pub async fn serve_admin(listener: TcpListener, router: Router, shutdown: Shutdown) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
