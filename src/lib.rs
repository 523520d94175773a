//! Boxoffice API Library
//!
//! Event-ticketing backend: hosted checkout sessions, signed payment
//! webhooks, idempotent ticket issuance, transactional email and invoice
//! rendering.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod migrator;
pub mod openapi;
pub mod payments;
pub mod services;

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::middleware::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, errors::ServiceError>;

// API v1 routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status endpoint
        .route("/status", get(handlers::health::api_status))
        // Catalog
        .route(
            "/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route("/events/{id}", get(handlers::events::get_event))
        .route(
            "/events/{id}/ticket-types",
            get(handlers::events::list_ticket_types).post(handlers::events::create_ticket_type),
        )
        // Checkout (browser-facing, CORS pre-flight handled by the CORS layer)
        .route(
            "/checkout/session",
            post(handlers::checkout::create_checkout_session),
        )
        // Payment webhook (unauthenticated, signature-verified)
        .route(
            "/payments/webhook",
            post(handlers::payment_webhooks::payment_webhook),
        )
        // Orders & invoices
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route(
            "/invoices/{order_id}",
            get(handlers::invoices::download_invoice),
        )
        // Profiles
        .route("/profiles", post(handlers::profiles::create_profile))
        .route("/profiles/{id}", get(handlers::profiles::get_profile))
        .route(
            "/profiles/{id}/verification",
            put(handlers::profiles::update_verification),
        )
        // Email senders
        .route("/emails/welcome", post(handlers::emails::send_welcome))
        .route("/emails/invoice", post(handlers::emails::send_invoice))
        .route("/emails/contact", post(handlers::emails::send_contact))
        .route(
            "/emails/verification",
            post(handlers::emails::send_verification),
        )
}
