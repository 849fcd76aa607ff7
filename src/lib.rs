pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod notify;
pub mod rate_limit;
pub mod retry;
pub mod routes;
pub mod state;
pub mod workflow;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::Mailer;
use crate::rate_limit::RecipientRateLimiter;
use crate::state::{AppState, SharedState};

const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Router of the notification relay. Without a mailer the relay answers
/// 503 to every send. Must be called inside a Tokio runtime.
pub fn build_app(config: Config, mailer: Option<Arc<dyn Mailer>>) -> Router {
    if mailer.is_none() {
        tracing::warn!("No mailer configured, notification relay will reject sends");
    }

    let state: SharedState = Arc::new(AppState {
        limiter: RecipientRateLimiter::hourly(config.notify.per_recipient_limit),
        config,
        mailer,
    });

    let weak = Arc::downgrade(&state);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
        loop {
            tick.tick().await;
            let Some(state) = weak.upgrade() else { break };
            state.limiter.cleanup();
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .merge(routes::relay_routes())
        .route("/health", axum::routing::get(health))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
