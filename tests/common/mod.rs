use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use portal::auth::{AuthProvider, PgAuthProvider};
use portal::config::{AuthTimings, Config, NOTIFY_PATH, NotifyConfig};
use portal::db::{PgStore, Store};
use portal::email::Mailer;
use portal::models::{NewProfile, Profile, Role};

pub const RELAY_KEY: &str = "test-relay-key";
pub const JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";

/// A running relay bound to a random local port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn notify_url(&self) -> String {
        self.url(NOTIFY_PATH)
    }

    /// Post a notification with the relay key, return (body, status).
    pub async fn notify(&self, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.notify_url())
            .bearer_auth(RELAY_KEY)
            .json(body)
            .send()
            .await
            .expect("notify request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Captures every email instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<String, String> {
        let mut sent = self.sent.lock();
        sent.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(format!("test-message-{}", sent.len()))
    }
}

/// Rejects every email with a fixed reason.
pub struct FailingMailer(pub &'static str);

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> Result<String, String> {
        Err(self.0.to_string())
    }
}

pub fn test_config(per_recipient_limit: u32) -> Config {
    Config {
        database_url: None,
        jwt_secret: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        site_url: "https://portal.test".to_string(),
        log_level: "warn".to_string(),
        notify: NotifyConfig {
            url: String::new(),
            api_key: Some(RELAY_KEY.to_string()),
            per_recipient_limit,
        },
        smtp: None,
        timings: AuthTimings::default(),
    }
}

/// Spawn the relay with the given mailer.
pub async fn spawn_app(mailer: Option<Arc<dyn Mailer>>) -> TestApp {
    spawn_with(test_config(30), mailer).await
}

pub async fn spawn_with(config: Config, mailer: Option<Arc<dyn Mailer>>) -> TestApp {
    let app = portal::build_app(config, mailer);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    TestApp { addr, client }
}

pub fn status_update() -> Value {
    json!({
        "to": "ana@example.com",
        "clientName": "Ana",
        "projectName": "Website",
        "updateType": "status",
        "oldValue": "In Progress",
        "newValue": "Review",
        "message": "Ready for your feedback"
    })
}

/// A dedicated, migrated test database.
#[allow(dead_code)]
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
}

#[allow(dead_code)]
impl TestDb {
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    pub fn auth(&self) -> PgAuthProvider {
        let mut config = test_config(30);
        config.jwt_secret = Some(JWT_SECRET.to_string());
        PgAuthProvider::from_config(self.pool.clone(), &config).unwrap()
    }

    /// Register an identity and give it a profile with `role`.
    pub async fn profile(&self, email: &str, role: Role) -> Profile {
        let identity = self
            .auth()
            .sign_up(email, "password123")
            .await
            .expect("sign up failed");
        self.store()
            .insert_profile(&NewProfile {
                id: identity.id,
                email: identity.email,
                role,
                full_name: None,
                company_name: None,
            })
            .await
            .expect("insert profile failed")
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a fresh database and apply migrations.
#[allow(dead_code)]
pub async fn spawn_db() -> TestDb {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let db_name = format!("portal_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let store = PgStore::connect(&test_url)
        .await
        .expect("Failed to connect to test database");
    store
        .migrate()
        .await
        .expect("Failed to run migrations on test database");

    TestDb {
        pool: store.pool().clone(),
        db_name,
    }
}

/// Drop the test database.
#[allow(dead_code)]
pub async fn cleanup_db(db: TestDb) {
    let db_name = db.db_name.clone();
    db.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
