use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use subtle::ConstantTimeEq;

use crate::email::templates;
use crate::error::AppError;
use crate::models::{NotificationRequest, NotificationResponse};
use crate::state::SharedState;

/// Render and send a project update email for the posted notification.
pub async fn send_project_update_email(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<NotificationResponse>, AppError> {
    authorize(&state, &headers)?;

    let req: NotificationRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?;

    if req.to.trim().is_empty() {
        return Err(AppError::BadRequest("Recipient is required".to_string()));
    }

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Email delivery is not configured".to_string()))?;

    state.limiter.check(&req.to).map_err(|retry_after| {
        tracing::warn!(to = %req.to, "Recipient rate limit reached");
        AppError::RateLimited(format!(
            "Too many emails to this recipient. Try again in {retry_after} seconds."
        ))
    })?;

    let (subject, html) = templates::render_project_update(&req, &state.config.site_url);
    let message_id = mailer
        .send(&req.to, &subject, &html)
        .await
        .map_err(AppError::Delivery)?;

    tracing::info!(
        to = %req.to,
        update_type = ?req.update_type,
        %message_id,
        "Project update email sent"
    );

    Ok(Json(NotificationResponse {
        success: true,
        message_id,
    }))
}

/// Bearer check, only enforced when a relay key is configured.
fn authorize(state: &SharedState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.config.notify.api_key.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid or missing API key".to_string()))
    }
}
