//! Stripe webhook endpoint.
//!
//! The raw body is verified against the `stripe-signature` header before it
//! is parsed; any change to the bytes invalidates the signature.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::WebhookOutcome;
use crate::state::AppState;
use crate::stripe::{Event, SIGNATURE_HEADER, TOLERANCE_SECS, verify_signature};

/// Acknowledgement returned to Stripe.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(flatten)]
    pub outcome: WebhookOutcome,
}

/// Receive a Stripe event.
///
/// POST /webhooks/stripe
#[instrument(skip_all)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("missing stripe-signature header".to_string()))?;

    verify_signature(
        &body,
        signature,
        state.webhook_secret().expose_secret(),
        Utc::now().timestamp(),
        TOLERANCE_SECS,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected Stripe webhook");
        AppError::InvalidSignature(e.to_string())
    })?;

    let event: Event = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {e}")))?;

    let outcome = state.checkout().handle_event(event).await?;

    Ok(Json(WebhookResponse {
        received: true,
        outcome,
    }))
}
