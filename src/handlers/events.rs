use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{event, ticket_type};
use crate::services::catalog::{CreateEventRequest, CreateTicketTypeRequest};
use crate::{errors::ServiceError, ApiResponse, AppState, ListQuery, PaginatedResponse};

// Event DTOs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub image_url: String,
    pub base_price: Decimal,
    pub total_tickets: i32,
    pub available_tickets: i32,
    pub created_at: DateTime<Utc>,
}

impl From<event::Model> for EventResponse {
    fn from(model: event::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            category: model.category,
            event_date: model.event_date,
            location: model.location,
            image_url: model.image_url,
            base_price: model.base_price,
            total_tickets: model.total_tickets,
            available_tickets: model.available_tickets,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketTypeResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub base_price: Decimal,
    pub capacity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_ref: Option<String>,
}

impl From<ticket_type::Model> for TicketTypeResponse {
    fn from(model: ticket_type::Model) -> Self {
        Self {
            id: model.id,
            event_id: model.event_id,
            name: model.name,
            base_price: model.base_price,
            capacity: model.capacity,
            price_ref: model.price_ref,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateEventBody {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[validate(length(min = 1))]
    pub category: String,

    pub event_date: DateTime<Utc>,

    #[validate(length(min = 1))]
    pub location: String,

    pub base_price: Decimal,

    #[validate(range(min = 1))]
    pub total_tickets: i32,

    /// Optional explicit image; otherwise one is picked for the category
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTicketTypeBody {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    pub base_price: Decimal,

    #[validate(range(min = 1))]
    pub capacity: i32,

    pub price_ref: Option<String>,
}

/// List events with pagination
#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Events retrieved successfully", body = ApiResponse<PaginatedResponse<EventResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<EventResponse>>>, ServiceError> {
    let result = state
        .services
        .catalog
        .list_events(query.page, query.limit)
        .await?;
    let total_pages = result.total.div_ceil(query.limit.max(1));
    let items: Vec<EventResponse> = result.events.into_iter().map(EventResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: result.total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Get a single event
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event retrieved successfully", body = ApiResponse<EventResponse>),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EventResponse>>, ServiceError> {
    let event = state.services.catalog.get_event_required(id).await?;
    Ok(Json(ApiResponse::success(EventResponse::from(event))))
}

/// Create an event (administrator action). The image URL is selected and
/// persisted here; later reads return the stored URL unchanged.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventBody,
    responses(
        (status = 201, description = "Event created successfully", body = ApiResponse<EventResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    tag = "Events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<CreateEventBody>,
) -> Result<impl IntoResponse, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .services
        .catalog
        .create_event(CreateEventRequest {
            title: body.title,
            description: body.description,
            category: body.category,
            event_date: body.event_date,
            location: body.location,
            base_price: body.base_price,
            total_tickets: body.total_tickets,
            image_url: body.image_url,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(EventResponse::from(created))),
    ))
}

/// List an event's ticket types
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/ticket-types",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Ticket types retrieved successfully", body = ApiResponse<Vec<TicketTypeResponse>>),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Events"
)]
pub async fn list_ticket_types(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TicketTypeResponse>>>, ServiceError> {
    state.services.catalog.get_event_required(id).await?;
    let types = state.services.catalog.list_ticket_types(id).await?;
    Ok(Json(ApiResponse::success(
        types.into_iter().map(TicketTypeResponse::from).collect(),
    )))
}

/// Register a ticket type for an event
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/ticket-types",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = CreateTicketTypeBody,
    responses(
        (status = 201, description = "Ticket type created successfully", body = ApiResponse<TicketTypeResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Events"
)]
pub async fn create_ticket_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateTicketTypeBody>,
) -> Result<impl IntoResponse, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .services
        .catalog
        .create_ticket_type(
            id,
            CreateTicketTypeRequest {
                name: body.name,
                base_price: body.base_price,
                capacity: body.capacity,
                price_ref: body.price_ref,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TicketTypeResponse::from(created))),
    ))
}
