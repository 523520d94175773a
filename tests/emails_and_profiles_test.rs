//! Integration tests for the email endpoints and the profile verification
//! lifecycle.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

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

#[tokio::test]
async fn welcome_email_is_dispatched_through_the_provider() {
    let email = mock_email_server().await;
    let app = TestApp::with_provider_urls(None, Some(email.uri())).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/emails/welcome",
            Some(json!({ "recipient": "alice@example.com", "name": "Alice" })),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["id"], "email_test_1");

    let requests = email.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["to"][0], "alice@example.com");
    assert!(sent["html"].as_str().unwrap().contains("Alice"));
}

#[tokio::test]
async fn invalid_recipient_is_rejected_before_any_send() {
    let email = mock_email_server().await;
    let app = TestApp::with_provider_urls(None, Some(email.uri())).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/emails/welcome",
            Some(json!({ "recipient": "not-an-email", "name": "Alice" })),
        )
        .await;

    assert_eq!(response.status(), 400);
    assert!(email.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn provider_rejection_surfaces_as_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;
    let app = TestApp::with_provider_urls(None, Some(server.uri())).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/emails/contact",
            Some(json!({
                "name": "Alice",
                "email": "alice@example.com",
                "message": "Hello there"
            })),
        )
        .await;

    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn invoice_email_requires_an_existing_order() {
    let email = mock_email_server().await;
    let app = TestApp::with_provider_urls(None, Some(email.uri())).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/emails/invoice",
            Some(json!({
                "recipient": "alice@example.com",
                "order_id": "00000000-0000-0000-0000-000000000000"
            })),
        )
        .await;

    assert_eq!(response.status(), 404);
    assert!(email.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn verification_transition_persists_and_notifies() {
    let email = mock_email_server().await;
    let app = TestApp::with_provider_urls(None, Some(email.uri())).await;

    let profile = response_json(
        app.request(
            Method::POST,
            "/api/v1/profiles",
            Some(json!({
                "display_name": "Alice",
                "email": "alice@example.com",
                "profile_category": "student"
            })),
        )
        .await,
    )
    .await["data"]
        .clone();
    assert_eq!(profile["verification_status"], "pending");
    let profile_id = profile["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/profiles/{}/verification", profile_id),
            Some(json!({ "status": "verified" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["verification_status"], "verified");

    // One status email went out
    let requests = email.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["to"][0], "alice@example.com");

    // Re-applying the same status is a no-op: no second email
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/profiles/{}/verification", profile_id),
            Some(json!({ "status": "verified" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(email.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_verification_status_is_rejected() {
    let app = TestApp::new().await;

    let profile = response_json(
        app.request(
            Method::POST,
            "/api/v1/profiles",
            Some(json!({
                "display_name": "Alice",
                "email": "alice@example.com",
                "profile_category": "student"
            })),
        )
        .await,
    )
    .await["data"]
        .clone();
    let profile_id = profile["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/profiles/{}/verification", profile_id),
            Some(json!({ "status": "approved-ish" })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn verification_failure_email_does_not_undo_the_transition() {
    // Unreachable email provider: the send fails, the status change stands
    let app = TestApp::new().await;

    let profile = response_json(
        app.request(
            Method::POST,
            "/api/v1/profiles",
            Some(json!({
                "display_name": "Alice",
                "email": "alice@example.com",
                "profile_category": "retiree"
            })),
        )
        .await,
    )
    .await["data"]
        .clone();
    let profile_id = profile["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/profiles/{}/verification", profile_id),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let fetched = response_json(
        app.request(
            Method::GET,
            &format!("/api/v1/profiles/{}", profile_id),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(fetched["data"]["verification_status"], "rejected");
}
