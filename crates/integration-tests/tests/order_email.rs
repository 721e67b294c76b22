//! The order email function: resend receipt and internal notification.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use reform_shop_integration_tests::{SUPPORT_ADDRESS, TestContext, checkout_completed_event};
use serde_json::json;
use uuid::Uuid;

async fn context_with_order() -> (TestContext, String) {
    let ctx = TestContext::new();
    let (status, body) = ctx
        .post_webhook(&checkout_completed_event("evt_email", "cs_email"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["order_id"].as_str().unwrap().to_string();
    (ctx, order_id)
}

#[tokio::test]
async fn test_sends_both_emails_for_existing_order() {
    let (ctx, order_id) = context_with_order().await;

    let (status, body) = ctx
        .post_json("/functions/send-order-email", &json!({ "order_id": order_id }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order_id"], order_id.as_str());
    assert_eq!(body["emails"]["customer"]["status"], "sent");
    assert_eq!(body["emails"]["internal"]["status"], "sent");

    // Two from the webhook, two from this call.
    let sent = ctx.mailer.attempts().await;
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[2].to, "jane@example.com");
    assert_eq!(sent[3].to, SUPPORT_ADDRESS);
}

#[tokio::test]
async fn test_accepts_camel_case_order_id() {
    let (ctx, order_id) = context_with_order().await;

    let (status, _) = ctx
        .post_json("/functions/send-order-email", &json!({ "orderId": order_id }))
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_internal_email_still_sent_when_customer_email_fails() {
    let ctx = TestContext::new();
    ctx.mailer.fail_for("jane@example.com").await;

    let (status, body) = ctx
        .post_webhook(&checkout_completed_event("evt_fail", "cs_fail"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["customer"]["status"], "failed");
    assert_eq!(body["notification"]["internal"]["status"], "sent");

    let order_id = body["order_id"].as_str().unwrap().to_string();
    let (status, body) = ctx
        .post_json("/functions/send-order-email", &json!({ "order_id": order_id }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(
        body["emails"]["customer"]["error"]
            .as_str()
            .unwrap()
            .contains("jane@example.com")
    );

    let sent = ctx.mailer.attempts().await;
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3].to, SUPPORT_ADDRESS);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post_json(
            "/functions/send-order-email",
            &json!({ "order_id": Uuid::new_v4() }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert!(ctx.mailer.attempts().await.is_empty());
}

#[tokio::test]
async fn test_missing_or_malformed_order_id_is_bad_request() {
    let ctx = TestContext::new();

    for payload in [json!({}), json!({ "order_id": "not-a-uuid" })] {
        let (status, body) = ctx.post_json("/functions/send-order-email", &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("A valid order_id is required")
        );
    }
    assert!(ctx.mailer.attempts().await.is_empty());
}
