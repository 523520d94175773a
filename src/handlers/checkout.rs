use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::checkout::{
    CheckoutLineItem, CreateSessionCommand, PriceLineItem,
};
use crate::{errors::ServiceError, AppState};

fn default_quantity() -> u32 {
    1
}

/// Ad-hoc line item. `title`/`price` are accepted as aliases for storefront
/// compatibility; items referencing a ticket type may omit both and let the
/// catalog (plus profile discount) fill them in.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LineItemBody {
    #[serde(default, alias = "title")]
    pub name: Option<String>,

    #[serde(default, alias = "price")]
    pub unit_price: Option<Decimal>,

    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: u32,

    #[serde(default)]
    pub ticket_type_id: Option<Uuid>,
}

/// Pre-registered provider price + quantity
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PriceItemBody {
    #[serde(alias = "price_id")]
    #[validate(length(min = 1))]
    pub price_ref: String,

    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCheckoutSessionRequest {
    pub event_id: Uuid,

    #[validate(email(message = "A valid purchaser email is required"))]
    pub customer_email: String,

    #[serde(default)]
    pub profile_id: Option<Uuid>,

    /// Variant (a): ad-hoc line items
    #[serde(default)]
    pub items: Option<Vec<LineItemBody>>,

    /// Variant (b): provider price references
    #[serde(default)]
    pub prices: Option<Vec<PriceItemBody>>,

    #[serde(default)]
    pub success_url: Option<String>,

    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub order_id: Uuid,
}

/// Create a hosted checkout session for a cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout/session",
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutSessionResponse),
        (status = 400, description = "Invalid cart", body = crate::errors::ErrorResponse),
        (status = 402, description = "Payment provider rejected the session", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown event or profile", body = crate::errors::ErrorResponse),
    ),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(body): Json<CreateCheckoutSessionRequest>,
) -> Result<Json<CheckoutSessionResponse>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let items = body
        .items
        .unwrap_or_default()
        .into_iter()
        .map(|item| CheckoutLineItem {
            name: item.name,
            unit_price: item.unit_price,
            quantity: item.quantity,
            ticket_type_id: item.ticket_type_id,
        })
        .collect();
    let prices = body
        .prices
        .unwrap_or_default()
        .into_iter()
        .map(|price| PriceLineItem {
            price_ref: price.price_ref,
            quantity: price.quantity,
        })
        .collect();

    let created = state
        .services
        .checkout
        .create_session(CreateSessionCommand {
            event_id: body.event_id,
            customer_email: body.customer_email,
            profile_id: body.profile_id,
            items,
            prices,
            success_url: body.success_url,
            cancel_url: body.cancel_url,
        })
        .await?;

    Ok(Json(CheckoutSessionResponse {
        session_id: created.session_id,
        url: created.url,
        order_id: created.order_id,
    }))
}
