use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub site_url: String,
    pub log_level: String,
    pub notify: NotifyConfig,
    pub smtp: Option<SmtpConfig>,
    pub timings: AuthTimings,
}

/// Where project-change notifications are posted, and the bearer key the
/// relay expects on them.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Notifications accepted per recipient per hour.
    pub per_recipient_limit: u32,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

/// Bounds used by the auth bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimings {
    /// Upper bound on a single profile lookup.
    pub profile_fetch_timeout: Duration,
    /// Forces `loading` off if initialization has not finished by then.
    pub bootstrap_fallback: Duration,
    pub profile_poll_attempts: u32,
    pub profile_poll_interval: Duration,
}

impl Default for AuthTimings {
    fn default() -> Self {
        Self {
            profile_fetch_timeout: Duration::from_secs(5),
            bootstrap_fallback: Duration::from_secs(10),
            profile_poll_attempts: 10,
            profile_poll_interval: Duration::from_millis(200),
        }
    }
}

pub const NOTIFY_PATH: &str = "/functions/v1/send-project-update-email";

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let jwt_secret = std::env::var("PORTAL_JWT_SECRET").ok();

        if let Some(secret) = &jwt_secret {
            if secret.len() < 32 {
                return Err("PORTAL_JWT_SECRET must be at least 32 characters".to_string());
            }
        }

        let host: IpAddr = env_or("PORTAL_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid PORTAL_HOST: {e}"))?;

        let port: u16 = env_or("PORTAL_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PORTAL_PORT: {e}"))?;

        let site_url = env_or("PORTAL_SITE_URL", &format!("http://{host}:{port}"));

        let log_level = env_or("PORTAL_LOG_LEVEL", "info");

        let notify = NotifyConfig {
            url: env_or("PORTAL_NOTIFY_URL", &format!("http://127.0.0.1:{port}{NOTIFY_PATH}")),
            api_key: std::env::var("PORTAL_NOTIFY_KEY").ok().filter(|k| !k.is_empty()),
            per_recipient_limit: env_or("PORTAL_NOTIFY_LIMIT", "30")
                .parse()
                .map_err(|e| format!("Invalid PORTAL_NOTIFY_LIMIT: {e}"))?,
        };

        let defaults = AuthTimings::default();
        let timings = AuthTimings {
            profile_fetch_timeout: env_millis(
                "PORTAL_PROFILE_FETCH_TIMEOUT_MS",
                defaults.profile_fetch_timeout,
            )?,
            bootstrap_fallback: env_millis("PORTAL_BOOTSTRAP_FALLBACK_MS", defaults.bootstrap_fallback)?,
            ..defaults
        };

        let smtp = match (
            std::env::var("PORTAL_SMTP_HOST").ok(),
            std::env::var("PORTAL_SMTP_PORT").ok(),
            std::env::var("PORTAL_SMTP_USER").ok(),
            std::env::var("PORTAL_SMTP_PASS").ok(),
            std::env::var("PORTAL_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid PORTAL_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            site_url,
            log_level,
            notify,
            smtp,
            timings,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_millis(key: &str, default: Duration) -> Result<Duration, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| format!("Invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}
