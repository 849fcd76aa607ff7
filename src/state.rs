use std::sync::Arc;

use crate::config::Config;
use crate::email::Mailer;
use crate::rate_limit::RecipientRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub limiter: RecipientRateLimiter,
}
