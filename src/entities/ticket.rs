use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub order_id: Uuid,
    pub event_id: Uuid,
    pub ticket_type_id: Option<Uuid>,

    /// Scan token: unique, cryptographically random, doubles as the QR payload
    pub qr_token: String,

    pub holder_name: String,
    pub holder_email: String,

    /// Per-unit amount the provider actually captured, not the list price
    pub final_price: Decimal,

    /// "valid", "used", "refunded" or "cancelled"
    pub status: String,

    /// Provider session that issued this ticket; the idempotency key for
    /// at-least-once webhook delivery
    pub checkout_session_id: String,

    pub issued_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::ticket_type::Entity",
        from = "Column::TicketTypeId",
        to = "super::ticket_type::Column::Id"
    )]
    TicketType,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::ticket_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
