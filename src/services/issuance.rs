//! Ticket issuance for completed checkout sessions.
//!
//! This is the webhook's write path. Delivery is at-least-once, so every step
//! is arranged around one rule: a session id issues tickets exactly once.
//! The pending→paid transition is a conditional update and the session id is
//! unique on orders, which lets concurrent deliveries race safely across
//! handler instances with no shared in-process lock.

use crate::{
    db::DbPool,
    entities::event::{self, Entity as EventEntity},
    entities::order::{self, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::ticket::{self, Entity as TicketEntity},
    errors::ServiceError,
    events::{DomainEvent, EventSender},
    payments::{from_minor_units, CheckoutSessionObject},
    services::email::EmailService,
};
use chrono::Utc;
use rand::RngCore;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result of processing one completed-session notification
#[derive(Debug)]
pub enum IssuanceOutcome {
    /// Tickets were created by this delivery
    Issued {
        order_id: Uuid,
        tickets: Vec<ticket::Model>,
    },
    /// The session was already fulfilled by an earlier delivery
    AlreadyProcessed,
}

/// Issues tickets and dispatches the confirmation email after payment
#[derive(Clone)]
pub struct IssuanceService {
    db: Arc<DbPool>,
    email: Arc<EmailService>,
    event_sender: Option<Arc<EventSender>>,
}

impl IssuanceService {
    pub fn new(
        db: Arc<DbPool>,
        email: Arc<EmailService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            email,
            event_sender,
        }
    }

    /// Processes a verified `checkout.session.completed` notification.
    ///
    /// Returns `AlreadyProcessed` (still an acknowledgement) when the session
    /// was fulfilled before; fails when the order or event cannot be resolved
    /// so the provider retries.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn process_completed_session(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<IssuanceOutcome, ServiceError> {
        // Fast idempotency check before any work
        let existing = TicketEntity::find()
            .filter(ticket::Column::CheckoutSessionId.eq(session.id.as_str()))
            .count(&*self.db)
            .await?;
        if existing > 0 {
            info!(session_id = %session.id, "Session already fulfilled, acknowledging duplicate delivery");
            return Ok(IssuanceOutcome::AlreadyProcessed);
        }

        let order = self.resolve_order(session).await?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} has no line items to issue tickets for",
                order.id
            )));
        }

        // Display data is mandatory: without the event there is no ticket
        let event = self.resolve_event(session, &items).await?;

        let purchaser_email = session
            .purchaser_email()
            .unwrap_or(order.customer_email.as_str())
            .to_string();
        let holder_name = session
            .purchaser_name()
            .unwrap_or(purchaser_email.as_str())
            .to_string();

        // The provider's captured total is the pricing source of truth;
        // snapshot prices are scaled to it when they drifted
        let captured_total = session.amount_total.map(from_minor_units);
        if let Some(captured) = captured_total {
            if captured != order.total_amount {
                warn!(
                    order_id = %order.id,
                    session_id = %session.id,
                    captured = %captured,
                    order_total = %order.total_amount,
                    "Captured amount differs from order snapshot; mirroring captured prices"
                );
            }
        }

        let total_quantity: i32 = items.iter().map(|item| item.quantity).sum();
        let now = Utc::now();

        let txn = self.db.begin().await?;

        // Conditional pending→paid transition: the store decides which
        // concurrent delivery wins
        let transition = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value("paid"))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .col_expr(order::Column::Version, Expr::value(order.version + 1))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq("pending"))
            .exec(&txn)
            .await?;
        if transition.rows_affected == 0 {
            txn.rollback().await?;
            info!(order_id = %order.id, session_id = %session.id, "Order already transitioned, acknowledging duplicate delivery");
            return Ok(IssuanceOutcome::AlreadyProcessed);
        }

        let mut tickets = Vec::with_capacity(total_quantity.max(0) as usize);
        for item in &items {
            let final_price =
                scaled_unit_price(item.unit_price, captured_total, order.total_amount);
            for _ in 0..item.quantity {
                let inserted = ticket::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order.id),
                    event_id: Set(event.id),
                    ticket_type_id: Set(item.ticket_type_id),
                    qr_token: Set(generate_scan_token()),
                    holder_name: Set(holder_name.clone()),
                    holder_email: Set(purchaser_email.clone()),
                    final_price: Set(final_price),
                    status: Set("valid".to_string()),
                    checkout_session_id: Set(session.id.clone()),
                    issued_at: Set(now),
                    redeemed_at: Set(None),
                }
                .insert(&txn)
                .await?;
                tickets.push(inserted);
            }
        }

        // Capacity follows sales; an oversell is clamped and logged rather
        // than failing an already-captured payment
        let remaining = event.available_tickets - total_quantity;
        if remaining < 0 {
            warn!(
                event_id = %event.id,
                order_id = %order.id,
                oversold_by = -remaining,
                "Event oversold; clamping availability at zero"
            );
        }
        let mut event_update: event::ActiveModel = event.clone().into();
        event_update.available_tickets = Set(remaining.max(0));
        event_update.updated_at = Set(Some(now));
        event_update.update(&txn).await?;

        txn.commit().await?;

        info!(
            order_id = %order.id,
            session_id = %session.id,
            count = tickets.len(),
            "Tickets issued"
        );

        if let Some(sender) = &self.event_sender {
            let _ = sender
                .send(DomainEvent::OrderPaid {
                    order_id: order.id,
                    session_id: session.id.clone(),
                })
                .await;
            let _ = sender
                .send(DomainEvent::TicketsIssued {
                    order_id: order.id,
                    event_id: event.id,
                    count: tickets.len() as u32,
                })
                .await;
        }

        // Notification is an independent outcome: the tickets above are
        // committed and stay committed whatever happens here
        match self
            .email
            .send_ticket_confirmation(
                &purchaser_email,
                &holder_name,
                &event,
                &order.currency,
                &tickets,
            )
            .await
        {
            Ok(id) => {
                info!(order_id = %order.id, email_id = %id, "Confirmation email dispatched");
                if let Some(sender) = &self.event_sender {
                    let _ = sender
                        .send(DomainEvent::EmailDispatched {
                            kind: "ticket_confirmation".to_string(),
                            recipient: purchaser_email.clone(),
                        })
                        .await;
                }
            }
            Err(e) => {
                error!(
                    order_id = %order.id,
                    session_id = %session.id,
                    error = %e,
                    "Confirmation email failed; tickets remain issued"
                );
                if let Some(sender) = &self.event_sender {
                    let _ = sender
                        .send(DomainEvent::EmailFailed {
                            kind: "ticket_confirmation".to_string(),
                            recipient: purchaser_email.clone(),
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        }

        Ok(IssuanceOutcome::Issued {
            order_id: order.id,
            tickets,
        })
    }

    /// Order lookup: session metadata first, then the session id column
    async fn resolve_order(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<order::Model, ServiceError> {
        if let Some(raw) = session.metadata.get("order_id") {
            if let Ok(order_id) = Uuid::parse_str(raw) {
                if let Some(order) = OrderEntity::find_by_id(order_id).one(&*self.db).await? {
                    return Ok(order);
                }
            }
        }

        OrderEntity::find()
            .filter(order::Column::CheckoutSessionId.eq(session.id.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No order found for checkout session {}",
                    session.id
                ))
            })
    }

    /// Event lookup: session metadata first, then the items' ticket types
    async fn resolve_event(
        &self,
        session: &CheckoutSessionObject,
        items: &[order_item::Model],
    ) -> Result<event::Model, ServiceError> {
        if let Some(raw) = session.metadata.get("event_id") {
            if let Ok(event_id) = Uuid::parse_str(raw) {
                if let Some(event) = EventEntity::find_by_id(event_id).one(&*self.db).await? {
                    return Ok(event);
                }
            }
        }

        for item in items {
            let Some(ticket_type_id) = item.ticket_type_id else {
                continue;
            };
            let ticket_type = crate::entities::ticket_type::Entity::find_by_id(ticket_type_id)
                .one(&*self.db)
                .await?;
            if let Some(ticket_type) = ticket_type {
                if let Some(event) = EventEntity::find_by_id(ticket_type.event_id)
                    .one(&*self.db)
                    .await?
                {
                    return Ok(event);
                }
            }
        }

        Err(ServiceError::NotFound(format!(
            "No event could be resolved for checkout session {}",
            session.id
        )))
    }
}

/// Cryptographically-random scan token; unique per ticket and used verbatim
/// as the QR payload
pub fn generate_scan_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Per-unit price mirrored from what the provider captured. When the captured
/// total matches the snapshot this is the snapshot price; when it drifted the
/// snapshot is scaled proportionally.
fn scaled_unit_price(
    unit_price: Decimal,
    captured_total: Option<Decimal>,
    order_total: Decimal,
) -> Decimal {
    match captured_total {
        Some(captured) if order_total > Decimal::ZERO && captured != order_total => {
            (unit_price * captured / order_total).round_dp(2)
        }
        _ => unit_price,
    }
}
