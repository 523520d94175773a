use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{order, order_item};
use crate::{errors::ServiceError, ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

fn map_status_str(status: &str) -> Result<OrderStatus, ServiceError> {
    match status.to_ascii_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "paid" => Ok(OrderStatus::Paid),
        "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
        other => Err(ServiceError::InvalidStatus(format!(
            "Unknown order status: {other}"
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type_id: Option<Uuid>,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            ticket_type_id: model.ticket_type_id,
            name: model.name,
            unit_price: model.unit_price,
            quantity: model.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Uuid>,
    pub customer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub currency: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn map_order(
    order: order::Model,
    items: Vec<order_item::Model>,
) -> Result<OrderResponse, ServiceError> {
    let status = map_status_str(&order.status)?;
    Ok(OrderResponse {
        id: order.id,
        order_number: order.order_number,
        profile_id: order.profile_id,
        customer_email: order.customer_email,
        checkout_session_id: order.checkout_session_id,
        status,
        total_amount: order.total_amount,
        currency: order.currency,
        items: items.into_iter().map(OrderItemResponse::from).collect(),
        created_at: order.created_at,
        updated_at: order.updated_at,
    })
}

/// List orders for reconciliation, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let result = state
        .services
        .orders
        .list_orders(query.page, query.limit)
        .await?;
    let total_pages = result.total.div_ceil(query.limit.max(1));
    let items: Vec<OrderResponse> = result
        .orders
        .into_iter()
        .map(|order| map_order(order, Vec::new()))
        .collect::<Result<_, _>>()?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: result.total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Get an order with its item snapshot
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let (order, items) = state
        .services
        .orders
        .get_order_with_items(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order with ID {} not found", id)))?;

    Ok(Json(ApiResponse::success(map_order(order, items)?)))
}
