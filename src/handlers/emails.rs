use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{errors::ServiceError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailSendResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct WelcomeEmailRequest {
    #[validate(email)]
    pub recipient: String,
    #[validate(length(min = 1))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct InvoiceEmailRequest {
    #[validate(email)]
    pub recipient: String,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ContactEmailRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct VerificationEmailRequest {
    #[validate(email)]
    pub recipient: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub status: String,
}

/// Send a welcome email
#[utoipa::path(
    post,
    path = "/api/v1/emails/welcome",
    request_body = WelcomeEmailRequest,
    responses(
        (status = 200, description = "Email dispatched", body = EmailSendResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Email provider rejected the send", body = crate::errors::ErrorResponse),
    ),
    tag = "Emails"
)]
pub async fn send_welcome(
    State(state): State<AppState>,
    Json(body): Json<WelcomeEmailRequest>,
) -> Result<Json<EmailSendResponse>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let id = state
        .services
        .email
        .send_welcome(&body.recipient, &body.name)
        .await?;
    Ok(Json(EmailSendResponse { success: true, id }))
}

/// Send an invoice email for an existing order
#[utoipa::path(
    post,
    path = "/api/v1/emails/invoice",
    request_body = InvoiceEmailRequest,
    responses(
        (status = 200, description = "Email dispatched", body = EmailSendResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Email provider rejected the send", body = crate::errors::ErrorResponse),
    ),
    tag = "Emails"
)]
pub async fn send_invoice(
    State(state): State<AppState>,
    Json(body): Json<InvoiceEmailRequest>,
) -> Result<Json<EmailSendResponse>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (order, items) = state
        .services
        .orders
        .get_order_with_items(body.order_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Order with ID {} not found", body.order_id))
        })?;

    let id = state
        .services
        .email
        .send_invoice(&body.recipient, &order, &items)
        .await?;
    Ok(Json(EmailSendResponse { success: true, id }))
}

/// Forward a contact-form submission
#[utoipa::path(
    post,
    path = "/api/v1/emails/contact",
    request_body = ContactEmailRequest,
    responses(
        (status = 200, description = "Email dispatched", body = EmailSendResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Email provider rejected the send", body = crate::errors::ErrorResponse),
    ),
    tag = "Emails"
)]
pub async fn send_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactEmailRequest>,
) -> Result<Json<EmailSendResponse>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let id = state
        .services
        .email
        .send_contact_message(&body.name, &body.email, &body.message)
        .await?;
    Ok(Json(EmailSendResponse { success: true, id }))
}

/// Send a verification-status email
#[utoipa::path(
    post,
    path = "/api/v1/emails/verification",
    request_body = VerificationEmailRequest,
    responses(
        (status = 200, description = "Email dispatched", body = EmailSendResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Email provider rejected the send", body = crate::errors::ErrorResponse),
    ),
    tag = "Emails"
)]
pub async fn send_verification(
    State(state): State<AppState>,
    Json(body): Json<VerificationEmailRequest>,
) -> Result<Json<EmailSendResponse>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let id = state
        .services
        .email
        .send_verification_status(&body.recipient, &body.name, &body.status)
        .await?;
    Ok(Json(EmailSendResponse { success: true, id }))
}
