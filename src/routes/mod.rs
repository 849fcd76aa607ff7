pub mod notify;

use axum::Router;
use axum::routing::post;

use crate::config::NOTIFY_PATH;
use crate::state::SharedState;

pub fn relay_routes() -> Router<SharedState> {
    Router::new().route(NOTIFY_PATH, post(notify::send_project_update_email))
}
