use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Line item snapshot captured at order-creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub ticket_type_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<order::Model>,
    pub total: u64,
}

/// Service for order rows and their denormalized item snapshots.
/// Lifecycle events are emitted by the checkout and issuance services that
/// drive the transitions.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Human-readable order code derived from the internal id
    fn order_number_for(order_id: Uuid) -> String {
        let short: String = order_id
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase();
        format!("BOX-{}", short)
    }

    /// Inserts a pending order with its item snapshot in one transaction.
    /// Called after the provider session exists, so the session id is final.
    #[instrument(skip(self, items), fields(order_id = %order_id, session_id = %checkout_session_id))]
    pub async fn create_pending_order(
        &self,
        order_id: Uuid,
        profile_id: Option<Uuid>,
        customer_email: &str,
        currency: &str,
        checkout_session_id: &str,
        items: Vec<NewOrderItem>,
    ) -> Result<order::Model, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }

        let total_amount: Decimal = items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();

        let now = Utc::now();
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(Self::order_number_for(order_id)),
            profile_id: Set(profile_id),
            customer_email: Set(customer_email.to_string()),
            checkout_session_id: Set(Some(checkout_session_id.to_string())),
            status: Set("pending".to_string()),
            total_amount: Set(total_amount),
            currency: Set(currency.to_string()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        }
        .insert(&txn)
        .await?;

        for item in items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                ticket_type_id: Set(item.ticket_type_id),
                name: Set(item.name),
                unit_price: Set(item.unit_price),
                quantity: Set(item.quantity),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(order_id = %order_id, total = %order_model.total_amount, "Pending order created");
        Ok(order_model)
    }

    /// Retrieves an order by ID
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        Ok(OrderEntity::find_by_id(order_id).one(&*self.db).await?)
    }

    /// Retrieves an order with its item snapshot
    pub async fn get_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<Option<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        let Some(order) = self.get_order(order_id).await? else {
            return Ok(None);
        };
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(Some((order, items)))
    }

    /// Resolves an order by the provider session backing it
    pub async fn find_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order::Column::CheckoutSessionId.eq(session_id))
            .one(&*self.db)
            .await?)
    }

    /// Lists orders, newest first
    pub async fn list_orders(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderListResponse { orders, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_are_prefixed_and_stable() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let number = OrderService::order_number_for(id);
        assert_eq!(number, "BOX-550E8400");
        assert_eq!(number, OrderService::order_number_for(id));
    }
}
