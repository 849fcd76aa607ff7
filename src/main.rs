use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use portal::auth::PgAuthProvider;
use portal::config::Config;
use portal::db::PgStore;
use portal::email::{Mailer, SmtpMailer};

const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting project portal relay");

    // The relay itself is stateless; the schema is applied here so a single
    // deployment also provisions the portal database.
    if let Some(database_url) = &config.database_url {
        let store = PgStore::connect(database_url).await?;
        store.migrate().await?;
        tracing::info!("Migrations applied");

        match PgAuthProvider::from_config(store.pool().clone(), &config) {
            Ok(auth) => {
                tokio::spawn(async move {
                    let mut tick = tokio::time::interval(TOKEN_PURGE_INTERVAL);
                    loop {
                        tick.tick().await;
                        match auth.purge_expired_tokens().await {
                            Ok(0) => {}
                            Ok(purged) => tracing::info!(purged, "Expired refresh tokens removed"),
                            Err(e) => tracing::warn!(error = %e, "Refresh token purge failed"),
                        }
                    }
                });
            }
            Err(e) => tracing::warn!("Refresh token purge disabled: {e}"),
        }
    }

    let mailer: Option<Arc<dyn Mailer>> = config.smtp.as_ref().and_then(|smtp| {
        match SmtpMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!("SMTP configured");
                Some(Arc::new(mailer) as Arc<dyn Mailer>)
            }
            Err(e) => {
                tracing::warn!("SMTP not available: {e}");
                None
            }
        }
    });

    let addr = SocketAddr::new(config.host, config.port);
    let app = portal::build_app(config, mailer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
