use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use sqlx::PgPool;

use crate::auth::password;
use crate::auth::provider::{AuthProvider, Listener, ListenerId, ListenerRegistry};
use crate::auth::token::{self, Claims, REFRESH_TOKEN_DAYS};
use crate::config::Config;
use crate::db;
use crate::error::PortalError;
use crate::models::{AuthChange, AuthEvent, Identity, IdentityRecord, Session};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Auth provider backed by the `identities` and `refresh_tokens` tables.
///
/// Access tokens are short-lived HS256 JWTs; refresh tokens are random,
/// stored hashed, rotated on every use, and a reused token revokes every
/// session of its identity.
pub struct PgAuthProvider {
    pool: PgPool,
    jwt_secret: String,
    current: Mutex<Option<Session>>,
    listeners: ListenerRegistry,
}

impl PgAuthProvider {
    pub fn new(pool: PgPool, jwt_secret: String) -> Self {
        Self {
            pool,
            jwt_secret,
            current: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Requires `PORTAL_JWT_SECRET`; there is no default signing key.
    pub fn from_config(pool: PgPool, config: &Config) -> Result<Self, String> {
        let secret = config
            .jwt_secret
            .clone()
            .ok_or_else(|| "PORTAL_JWT_SECRET must be set to issue sessions".to_string())?;
        Ok(Self::new(pool, secret))
    }

    /// Delete expired refresh tokens. Rotated ones are kept for reuse detection.
    pub async fn purge_expired_tokens(&self) -> Result<u64, PortalError> {
        Ok(db::refresh_tokens::delete_expired(&self.pool).await?)
    }

    /// Resume a session persisted by the caller.
    pub fn restore(&self, session: Session) {
        *self.current.lock() = Some(session);
    }

    async fn issue_session(&self, identity: &IdentityRecord) -> Result<Session, PortalError> {
        let claims = Claims::new(identity.id, identity.email.clone());
        let access_token = token::encode_token(&claims, &self.jwt_secret)?;

        let refresh_token = token::generate_refresh_token();
        db::refresh_tokens::create(
            &self.pool,
            identity.id,
            &token::hash_token(&refresh_token),
            Utc::now() + Duration::days(REFRESH_TOKEN_DAYS),
        )
        .await?;

        let session = Session {
            access_token,
            refresh_token,
            expires_at: claims.expires_at(),
            user: Identity {
                id: identity.id,
                email: identity.email.clone(),
            },
        };
        *self.current.lock() = Some(session.clone());
        Ok(session)
    }

    /// Exchange the session's refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, PortalError> {
        let stored = db::refresh_tokens::find_by_hash(&self.pool, &token::hash_token(refresh_token))
            .await?
            .ok_or_else(|| PortalError::Auth("Invalid refresh token".to_string()))?;

        if stored.used {
            tracing::warn!(
                identity_id = %stored.identity_id,
                "Refresh token reuse detected, revoking all sessions"
            );
            db::refresh_tokens::delete_all_for_identity(&self.pool, stored.identity_id).await?;
            return Err(PortalError::Auth(
                "Refresh token reuse detected. All sessions revoked.".to_string(),
            ));
        }

        if stored.expires_at < Utc::now() {
            return Err(PortalError::Auth("Refresh token expired".to_string()));
        }

        db::refresh_tokens::mark_used(&self.pool, stored.id).await?;

        let identity = db::identities::find_by_id(&self.pool, stored.identity_id)
            .await?
            .ok_or_else(|| PortalError::Auth("User not found".to_string()))?;

        let session = self.issue_session(&identity).await?;
        self.listeners
            .emit(AuthChange {
                event: AuthEvent::TokenRefreshed,
                session: Some(session.clone()),
            })
            .await;
        Ok(session)
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), PortalError> {
    if email.is_empty() || !email.contains('@') {
        return Err(PortalError::Auth("Unable to validate email address: invalid format".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::Auth(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

#[async_trait]
impl AuthProvider for PgAuthProvider {
    async fn get_session(&self) -> Result<Option<Session>, PortalError> {
        let Some(session) = self.current.lock().clone() else {
            return Ok(None);
        };

        if token::decode_token(&session.access_token, &self.jwt_secret).is_ok() {
            return Ok(Some(session));
        }

        match self.refresh_session(&session.refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(PortalError::Auth(reason)) => {
                tracing::info!(%reason, "Persisted session could not be refreshed");
                *self.current.lock() = None;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, PortalError> {
        let email = email.trim();
        validate_credentials(email, password)?;

        let password_hash = password::hash(password)?;
        let identity = match db::identities::create(&self.pool, email, &password_hash).await {
            Ok(identity) => identity,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(PortalError::Auth("User already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(identity_id = %identity.id, "Identity registered");
        let session = self.issue_session(&identity).await?;
        self.listeners
            .emit(AuthChange {
                event: AuthEvent::SignedIn,
                session: Some(session),
            })
            .await;

        Ok(Identity {
            id: identity.id,
            email: identity.email,
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, PortalError> {
        let invalid = || PortalError::Auth("Invalid login credentials".to_string());

        let identity = db::identities::find_by_email(&self.pool, email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !password::verify(password, &identity.password_hash) {
            return Err(invalid());
        }

        let session = self.issue_session(&identity).await?;
        self.listeners
            .emit(AuthChange {
                event: AuthEvent::SignedIn,
                session: Some(session.clone()),
            })
            .await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), PortalError> {
        let session = self.current.lock().take();
        if let Some(session) = session {
            db::refresh_tokens::delete_all_for_identity(&self.pool, session.user.id).await?;
        }

        self.listeners
            .emit(AuthChange {
                event: AuthEvent::SignedOut,
                session: None,
            })
            .await;
        Ok(())
    }

    fn on_auth_state_change(&self) -> Listener {
        self.listeners.register()
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
