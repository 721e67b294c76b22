//! Order email function.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use reform_shop_core::OrderId;

use crate::error::{AppError, Result};
use crate::services::NotificationReport;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendOrderEmailRequest {
    #[serde(alias = "orderId")]
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
pub struct SendOrderEmailResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub emails: NotificationReport,
}

/// Send the receipt and internal notification for an order.
///
/// POST /functions/send-order-email
///
/// `success` is true only if both emails were accepted by the mailer; the
/// per-message outcome is in `emails`.
#[instrument(skip_all)]
pub async fn send(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendOrderEmailRequest>, JsonRejection>,
) -> Result<Json<SendOrderEmailResponse>> {
    let Json(request) = payload.map_err(|e| {
        AppError::BadRequest(format!("A valid order_id is required: {}", e.body_text()))
    })?;

    let report = state.notifier().send(request.order_id).await?;

    Ok(Json(SendOrderEmailResponse {
        success: report.all_sent(),
        order_id: request.order_id,
        emails: report,
    }))
}
