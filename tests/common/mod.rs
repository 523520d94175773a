//! Shared test harness: an in-memory application wired to mock provider
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response},
    routing::get,
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tokio::sync::mpsc;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

use boxoffice_api as api;
use boxoffice_api::config::{AppConfig, EmailConfig};

pub const WEBHOOK_SECRET: &str = "whsec_test_8f2a61c4d5e6";

pub struct TestApp {
    pub router: Router,
    pub state: api::AppState,
    pub db: Arc<api::db::DbPool>,
}

impl TestApp {
    /// App with unreachable provider endpoints; fine for anything that never
    /// makes it to an outbound call.
    pub async fn new() -> Self {
        Self::with_provider_urls(None, None).await
    }

    /// App whose payment/email providers point at mock servers.
    pub async fn with_provider_urls(
        payment_base: Option<String>,
        email_base: Option<String>,
    ) -> Self {
        let config = test_config(payment_base, email_base);

        // A single pooled connection keeps the in-memory database alive and
        // shared for the whole test
        let db = api::db::establish_connection_with_config(&api::db::DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(5),
        })
        .await
        .expect("sqlite connection");
        api::db::run_migrations(&db).await.expect("migrations");
        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = api::events::EventSender::new(event_tx);
        tokio::spawn(api::events::process_events(event_rx));

        let payments = Arc::new(
            api::payments::PaymentClient::new(
                config.payment_secret_key.clone(),
                config.payment_api_base.clone(),
            )
            .expect("payment client"),
        );
        let email = Arc::new(
            api::services::email::EmailService::from_config(&config.email).expect("email service"),
        );

        let services = api::handlers::AppServices::new(
            db.clone(),
            Arc::new(event_sender.clone()),
            payments,
            email,
            &config,
        );

        let state = api::AppState {
            db: db.clone(),
            config,
            event_sender,
            services,
        };

        let router = Router::new()
            .route("/health", get(api::handlers::health::health_check))
            .nest("/api/v1", api::api_v1_routes())
            .layer(CorsLayer::permissive())
            .layer(axum::middleware::from_fn(
                api::middleware::request_id_middleware,
            ))
            .with_state(state.clone());

        Self { router, state, db }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("response")
    }

    /// Posts a webhook body with the given signature header (if any).
    pub async fn post_webhook(&self, payload: &str, signature: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/payments/webhook")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header("Stripe-Signature", sig);
        }
        let request = builder
            .body(Body::from(payload.to_string()))
            .expect("request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("response")
    }
}

fn test_config(payment_base: Option<String>, email_base: Option<String>) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        environment: "development".into(),
        log_level: "debug".into(),
        log_json: false,
        payment_secret_key: "sk_test_4eC39HqLyjWDarjtT1zdp7dc".into(),
        payment_webhook_secret: WEBHOOK_SECRET.into(),
        payment_webhook_tolerance_secs: Some(300),
        // Port 9 (discard) is never listening; requests fail fast
        payment_api_base: payment_base.unwrap_or_else(|| "http://127.0.0.1:9".into()),
        frontend_base_url: "http://localhost:5173".into(),
        default_currency: "eur".into(),
        email: EmailConfig {
            api_key: Some("re_test_key".into()),
            api_base: email_base.unwrap_or_else(|| "http://127.0.0.1:9".into()),
            ..Default::default()
        },
        auto_migrate: false,
        cors_allowed_origins: None,
        cors_allow_any_origin: true,
        cors_allow_credentials: false,
        request_timeout_secs: 30,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 600,
        db_acquire_timeout_secs: 5,
        event_channel_capacity: 64,
    }
}

/// Signature header value the provider would attach to `payload`.
pub fn sign_webhook(payload: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes")
        .to_vec()
}
