use crate::{
    entities::event::{self, Entity as EventEntity},
    entities::ticket_type::{self, Entity as TicketTypeEntity},
    errors::ServiceError,
    events::{DomainEvent, EventSender},
    services::images,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    pub event_date: DateTime<Utc>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub base_price: Decimal,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub total_tickets: i32,
    /// When absent, an image is selected for the category and persisted
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTicketTypeRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub base_price: Decimal,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: i32,
    pub price_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<event::Model>,
    pub total: u64,
}

/// Service for the event catalog: events and their ticket types
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates an event. The image URL is chosen once here (random within the
    /// category pool) and persisted; redisplay never re-randomizes it.
    #[instrument(skip(self, request), fields(title = %request.title, category = %request.category))]
    pub async fn create_event(
        &self,
        request: CreateEventRequest,
    ) -> Result<event::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if request.base_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Base price cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let image_url = request
            .image_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| images::image_for_category(&request.category).to_string());

        let model = event::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title),
            description: Set(request.description),
            category: Set(request.category),
            event_date: Set(request.event_date),
            location: Set(request.location),
            image_url: Set(image_url),
            base_price: Set(request.base_price),
            total_tickets: Set(request.total_tickets),
            available_tickets: Set(request.total_tickets),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let created = model.insert(&*self.db).await?;
        info!(event_id = %created.id, "Event created");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(DomainEvent::EventCreated(created.id)).await {
                warn!(error = %e, event_id = %created.id, "Failed to send event-created event");
            }
        }

        Ok(created)
    }

    /// Retrieves an event by ID
    pub async fn get_event(&self, event_id: Uuid) -> Result<Option<event::Model>, ServiceError> {
        Ok(EventEntity::find_by_id(event_id).one(&*self.db).await?)
    }

    /// Retrieves an event by ID, failing when it does not exist
    pub async fn get_event_required(&self, event_id: Uuid) -> Result<event::Model, ServiceError> {
        self.get_event(event_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Event with ID {} not found", event_id))
        })
    }

    /// Lists events, newest first
    pub async fn list_events(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<EventListResponse, ServiceError> {
        let paginator = EventEntity::find()
            .order_by_desc(event::Column::EventDate)
            .paginate(&*self.db, limit.max(1));

        let total = paginator.num_items().await?;
        let events = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(EventListResponse { events, total })
    }

    /// Registers a ticket type for an event
    #[instrument(skip(self, request), fields(event_id = %event_id, name = %request.name))]
    pub async fn create_ticket_type(
        &self,
        event_id: Uuid,
        request: CreateTicketTypeRequest,
    ) -> Result<ticket_type::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        // Ticket types may only hang off an existing event
        self.get_event_required(event_id).await?;

        let model = ticket_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            event_id: Set(event_id),
            name: Set(request.name),
            base_price: Set(request.base_price),
            capacity: Set(request.capacity),
            price_ref: Set(request.price_ref),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(&*self.db).await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(DomainEvent::TicketTypeCreated {
                    event_id,
                    ticket_type_id: created.id,
                })
                .await
            {
                warn!(error = %e, "Failed to send ticket-type-created event");
            }
        }

        Ok(created)
    }

    /// Retrieves a ticket type by ID
    pub async fn get_ticket_type(
        &self,
        ticket_type_id: Uuid,
    ) -> Result<Option<ticket_type::Model>, ServiceError> {
        Ok(TicketTypeEntity::find_by_id(ticket_type_id)
            .one(&*self.db)
            .await?)
    }

    /// Ticket types belonging to an event
    pub async fn list_ticket_types(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<ticket_type::Model>, ServiceError> {
        Ok(TicketTypeEntity::find()
            .filter(ticket_type::Column::EventId.eq(event_id))
            .all(&*self.db)
            .await?)
    }

    /// Resolves a provider price reference to its ticket type
    pub async fn find_ticket_type_by_price_ref(
        &self,
        price_ref: &str,
    ) -> Result<Option<ticket_type::Model>, ServiceError> {
        Ok(TicketTypeEntity::find()
            .filter(ticket_type::Column::PriceRef.eq(price_ref))
            .one(&*self.db)
            .await?)
    }
}
