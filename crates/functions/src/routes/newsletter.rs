//! Newsletter signup and unsubscribe functions.
//!
//! Both are called from the shop frontend and answer in JSON.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::NewsletterError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub message: &'static str,
    pub discount_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reactivated: bool,
}

/// Subscribe to the newsletter.
///
/// POST /functions/newsletter-signup
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>> {
    let Json(request) =
        payload.map_err(|_| AppError::BadRequest("Email is required".to_string()))?;

    if request.email.trim().is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }

    let outcome = state.newsletter().subscribe(&request.email).await?;

    let (message, email_sent) = if outcome.reactivated {
        ("Successfully re-subscribed to newsletter", None)
    } else if outcome.email_sent {
        (
            "Successfully subscribed to newsletter and welcome email sent",
            Some(true),
        )
    } else {
        (
            "Successfully subscribed to newsletter (welcome email will be sent shortly)",
            Some(false),
        )
    };

    Ok(Json(SignupResponse {
        success: true,
        message,
        discount_code: outcome.discount_code,
        email_sent,
        reactivated: outcome.reactivated,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenParams {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Unsubscribe by token from a link (query string).
///
/// GET /functions/newsletter-unsubscribe?token=...
#[instrument(skip_all)]
pub async fn unsubscribe_link(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> Result<Response> {
    unsubscribe(&state, params.token).await
}

/// Unsubscribe by token from the frontend (query string or JSON body).
///
/// POST /functions/newsletter-unsubscribe
#[instrument(skip_all)]
pub async fn unsubscribe_post(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
    body: Bytes,
) -> Result<Response> {
    let token = match params.token {
        Some(token) => Some(token),
        None if body.is_empty() => None,
        None => {
            serde_json::from_slice::<TokenParams>(&body)
                .map_err(|_| AppError::BadRequest("Invalid request body".to_string()))?
                .token
        }
    };
    unsubscribe(&state, token).await
}

async fn unsubscribe(state: &AppState, token: Option<String>) -> Result<Response> {
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
        return Err(AppError::BadRequest(
            "Unsubscribe token is required".to_string(),
        ));
    };

    match state.newsletter().unsubscribe(&token).await {
        Ok(subscriber) => Ok(Json(UnsubscribeResponse {
            success: true,
            message: "Successfully unsubscribed from newsletter".to_string(),
            email: Some(subscriber.email.into_inner()),
        })
        .into_response()),
        Err(e @ (NewsletterError::InvalidToken | NewsletterError::AlreadyUnsubscribed)) => {
            tracing::info!(reason = %e, "Unsubscribe refused");
            Ok((
                StatusCode::BAD_REQUEST,
                Json(UnsubscribeResponse {
                    success: false,
                    message: e.to_string(),
                    email: None,
                }),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}
