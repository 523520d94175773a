//! Integration tests for the payment webhook: signature trust, event-type
//! filtering, idempotent ticket issuance and email-failure isolation.

mod common;

use axum::http::Method;
use common::{response_json, sign_webhook, TestApp, WEBHOOK_SECRET};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use boxoffice_api::entities::{Event, Ticket};

async fn mock_payment_server(session_id: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": session_id,
            "url": format!("https://pay.test/{}", session_id)
        })))
        .mount(&server)
        .await;
    server
}

async fn mock_email_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "email_test_1" })),
        )
        .mount(&server)
        .await;
    server
}

/// Creates an event and a checkout session through the API; returns
/// (event_id, order_id).
async fn seed_checkout(app: &TestApp, session_id: &str) -> (String, String) {
    let event = response_json(
        app.request(
            Method::POST,
            "/api/v1/events",
            Some(json!({
                "title": "Concert A",
                "description": "An evening of live music",
                "category": "concert",
                "event_date": "2026-09-01T20:00:00Z",
                "location": "Lyon",
                "base_price": "45.00",
                "total_tickets": 100
            })),
        )
        .await,
    )
    .await["data"]
        .clone();
    let event_id = event["id"].as_str().unwrap().to_string();

    let session = response_json(
        app.request(
            Method::POST,
            "/api/v1/checkout/session",
            Some(json!({
                "event_id": event_id,
                "customer_email": "alice@example.com",
                "items": [{ "title": "Concert A", "price": "45.00", "quantity": 1 }]
            })),
        )
        .await,
    )
    .await;
    assert_eq!(session["session_id"], session_id);
    (event_id, session["order_id"].as_str().unwrap().to_string())
}

fn completed_session_payload(session_id: &str, order_id: &str, event_id: &str) -> String {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "amount_total": 4500,
                "currency": "eur",
                "customer_details": { "email": "alice@example.com", "name": "Alice" },
                "payment_status": "paid",
                "metadata": { "order_id": order_id, "event_id": event_id }
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn completed_session_issues_exactly_one_ticket_and_emails_the_purchaser() {
    let payment = mock_payment_server("cs_test_1").await;
    let email = mock_email_server().await;
    let app = TestApp::with_provider_urls(Some(payment.uri()), Some(email.uri())).await;
    let (event_id, order_id) = seed_checkout(&app, "cs_test_1").await;

    let payload = completed_session_payload("cs_test_1", &order_id, &event_id);
    let signature = sign_webhook(&payload, WEBHOOK_SECRET);

    let response = app.post_webhook(&payload, Some(&signature)).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await, json!({ "received": true }));

    let tickets = Ticket::find().all(&*app.db).await.unwrap();
    assert_eq!(tickets.len(), 1);
    let ticket = &tickets[0];
    assert_eq!(ticket.status, "valid");
    assert_eq!(ticket.final_price, dec!(45.00));
    assert_eq!(ticket.holder_email, "alice@example.com");
    assert_eq!(ticket.checkout_session_id, "cs_test_1");
    assert_eq!(ticket.qr_token.len(), 64);

    // Order transitioned and capacity followed the sale
    let order: Value = response_json(
        app.request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
            .await,
    )
    .await;
    assert_eq!(order["data"]["status"], "paid");

    let event = Event::find().all(&*app.db).await.unwrap().remove(0);
    assert_eq!(event.available_tickets, 99);

    // Exactly one confirmation email went out to the purchaser
    let requests = email.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["to"][0], "alice@example.com");
}

#[tokio::test]
async fn duplicate_delivery_is_acknowledged_without_a_second_ticket() {
    let payment = mock_payment_server("cs_test_2").await;
    let email = mock_email_server().await;
    let app = TestApp::with_provider_urls(Some(payment.uri()), Some(email.uri())).await;
    let (event_id, order_id) = seed_checkout(&app, "cs_test_2").await;

    let payload = completed_session_payload("cs_test_2", &order_id, &event_id);
    let signature = sign_webhook(&payload, WEBHOOK_SECRET);

    let first = app.post_webhook(&payload, Some(&signature)).await;
    assert_eq!(first.status(), 200);

    // At-least-once delivery: the second copy must be a no-op that still acks
    let second = app.post_webhook(&payload, Some(&signature)).await;
    assert_eq!(second.status(), 200);
    assert_eq!(response_json(second).await, json!({ "received": true }));

    let tickets = Ticket::find().all(&*app.db).await.unwrap();
    assert_eq!(tickets.len(), 1);

    let event = Event::find().all(&*app.db).await.unwrap().remove(0);
    assert_eq!(event.available_tickets, 99);

    // No second confirmation email either
    let requests = email.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn invalid_signature_never_reaches_issuance() {
    let payment = mock_payment_server("cs_test_3").await;
    let app = TestApp::with_provider_urls(Some(payment.uri()), None).await;
    let (event_id, order_id) = seed_checkout(&app, "cs_test_3").await;

    let payload = completed_session_payload("cs_test_3", &order_id, &event_id);

    let unsigned = app.post_webhook(&payload, None).await;
    assert_eq!(unsigned.status(), 401);

    let badly_signed = app
        .post_webhook(&payload, Some("t=1,v1=deadbeef"))
        .await;
    assert_eq!(badly_signed.status(), 401);

    let wrong_secret = sign_webhook(&payload, "whsec_wrong_secret_value");
    let forged = app.post_webhook(&payload, Some(&wrong_secret)).await;
    assert_eq!(forged.status(), 401);

    assert!(Ticket::find().all(&*app.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn other_event_types_are_acknowledged_and_ignored() {
    let app = TestApp::new().await;

    let payload = json!({
        "id": "evt_other",
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_1" } }
    })
    .to_string();
    let signature = sign_webhook(&payload, WEBHOOK_SECRET);

    let response = app.post_webhook(&payload, Some(&signature)).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await, json!({ "received": true }));

    assert!(Ticket::find().all(&*app.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn unresolvable_order_fails_so_the_provider_retries() {
    let app = TestApp::new().await;

    let payload = completed_session_payload(
        "cs_unknown",
        "00000000-0000-0000-0000-000000000000",
        "00000000-0000-0000-0000-000000000000",
    );
    let signature = sign_webhook(&payload, WEBHOOK_SECRET);

    let response = app.post_webhook(&payload, Some(&signature)).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn email_failure_does_not_roll_back_issued_tickets() {
    let payment = mock_payment_server("cs_test_4").await;
    // No email mock: delivery hits an unreachable endpoint and fails
    let app = TestApp::with_provider_urls(Some(payment.uri()), None).await;
    let (event_id, order_id) = seed_checkout(&app, "cs_test_4").await;

    let payload = completed_session_payload("cs_test_4", &order_id, &event_id);
    let signature = sign_webhook(&payload, WEBHOOK_SECRET);

    // Ticket issuance succeeded, so the webhook still acks to stop retries
    let response = app.post_webhook(&payload, Some(&signature)).await;
    assert_eq!(response.status(), 200);

    let tickets = Ticket::find().all(&*app.db).await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].status, "valid");
}

#[tokio::test]
async fn malformed_payload_with_valid_signature_is_a_400() {
    let app = TestApp::new().await;

    let payload = "not-json";
    let signature = sign_webhook(payload, WEBHOOK_SECRET);

    let response = app.post_webhook(payload, Some(&signature)).await;
    assert_eq!(response.status(), 400);
}
