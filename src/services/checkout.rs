use crate::{
    errors::ServiceError,
    events::{DomainEvent, EventSender},
    payments::{self, PaymentClient, SessionLine, SessionParams},
    services::catalog::CatalogService,
    services::orders::{NewOrderItem, OrderService},
    services::pricing,
    services::profiles::ProfileService,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Ad-hoc line item (checkout variant a). Items referencing a ticket type may
/// omit the name and price; both are then derived from the catalog, with the
/// profile discount applied for verified purchasers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    pub name: Option<String>,
    pub unit_price: Option<Decimal>,
    pub quantity: u32,
    pub ticket_type_id: Option<Uuid>,
}

/// Pre-registered provider price + quantity (checkout variant b)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLineItem {
    pub price_ref: String,
    pub quantity: u32,
}

/// Command assembled by the checkout handler
#[derive(Debug, Clone)]
pub struct CreateSessionCommand {
    pub event_id: Uuid,
    pub customer_email: String,
    pub profile_id: Option<Uuid>,
    pub items: Vec<CheckoutLineItem>,
    pub prices: Vec<PriceLineItem>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Outcome returned to the browser
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub url: Option<String>,
    pub order_id: Uuid,
}

/// Creates hosted checkout sessions and the pending orders that mirror them
#[derive(Clone)]
pub struct CheckoutService {
    payments: Arc<PaymentClient>,
    orders: Arc<OrderService>,
    catalog: Arc<CatalogService>,
    profiles: Arc<ProfileService>,
    event_sender: Option<Arc<EventSender>>,
    currency: String,
    default_success_url: String,
    default_cancel_url: String,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payments: Arc<PaymentClient>,
        orders: Arc<OrderService>,
        catalog: Arc<CatalogService>,
        profiles: Arc<ProfileService>,
        event_sender: Option<Arc<EventSender>>,
        currency: String,
        default_success_url: String,
        default_cancel_url: String,
    ) -> Self {
        Self {
            payments,
            orders,
            catalog,
            profiles,
            event_sender,
            currency,
            default_success_url,
            default_cancel_url,
        }
    }

    /// Creates a provider session for the cart, then records the pending
    /// order. The remote call goes first so a provider failure leaves no
    /// local state behind.
    #[instrument(skip(self, cmd), fields(event_id = %cmd.event_id, customer_email = %cmd.customer_email))]
    pub async fn create_session(
        &self,
        cmd: CreateSessionCommand,
    ) -> Result<CreatedSession, ServiceError> {
        if cmd.items.is_empty() && cmd.prices.is_empty() {
            return Err(ServiceError::ValidationError(
                "Checkout requires at least one line item".to_string(),
            ));
        }
        if !cmd.items.is_empty() && !cmd.prices.is_empty() {
            return Err(ServiceError::ValidationError(
                "Provide either line items or price references, not both".to_string(),
            ));
        }
        if cmd
            .items
            .iter()
            .map(|i| i.quantity)
            .chain(cmd.prices.iter().map(|p| p.quantity))
            .any(|q| q == 0)
        {
            return Err(ServiceError::ValidationError(
                "Quantities must be at least 1".to_string(),
            ));
        }

        // The event must exist up front: the webhook later resolves it for
        // the confirmation email and fails the issuance if it cannot
        let event = self.catalog.get_event_required(cmd.event_id).await?;

        let discount_category = match cmd.profile_id {
            Some(profile_id) => {
                let profile = self
                    .profiles
                    .get_profile(profile_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Profile with ID {} not found", profile_id))
                    })?;
                pricing::eligible_category(&profile).map(str::to_string)
            }
            None => None,
        };

        let mut snapshot: Vec<NewOrderItem> = Vec::new();
        let mut lines: Vec<SessionLine> = Vec::new();

        for item in &cmd.items {
            let (name, unit_price, ticket_type_id) = match item.ticket_type_id {
                Some(ticket_type_id) => {
                    let ticket_type = self
                        .catalog
                        .get_ticket_type(ticket_type_id)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::ValidationError(format!(
                                "Line item references an unknown ticket type ({})",
                                ticket_type_id
                            ))
                        })?;
                    if ticket_type.event_id != cmd.event_id {
                        return Err(ServiceError::ValidationError(format!(
                            "Ticket type {} does not belong to event {}",
                            ticket_type_id, cmd.event_id
                        )));
                    }
                    let unit_price = match item.unit_price {
                        Some(price) => price,
                        None => match &discount_category {
                            Some(category) => {
                                pricing::discounted_price(ticket_type.base_price, category)
                            }
                            None => ticket_type.base_price,
                        },
                    };
                    let name = item.name.clone().unwrap_or_else(|| ticket_type.name.clone());
                    (name, unit_price, Some(ticket_type_id))
                }
                None => {
                    let name = item.name.clone().filter(|n| !n.trim().is_empty()).ok_or_else(
                        || {
                            ServiceError::ValidationError(
                                "Line items without a ticket type require a name".to_string(),
                            )
                        },
                    )?;
                    let unit_price = item.unit_price.ok_or_else(|| {
                        ServiceError::ValidationError(
                            "Line items without a ticket type require a unit price".to_string(),
                        )
                    })?;
                    (name, unit_price, None)
                }
            };

            lines.push(SessionLine::PriceData {
                name: name.clone(),
                unit_amount: payments::to_minor_units(unit_price)?,
                quantity: item.quantity,
            });
            snapshot.push(NewOrderItem {
                name,
                unit_price,
                quantity: item.quantity as i32,
                ticket_type_id,
            });
        }

        for price_line in &cmd.prices {
            let ticket_type = self
                .catalog
                .find_ticket_type_by_price_ref(&price_line.price_ref)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "Unknown price reference: {}",
                        price_line.price_ref
                    ))
                })?;
            if ticket_type.event_id != cmd.event_id {
                return Err(ServiceError::ValidationError(format!(
                    "Price reference {} does not belong to event {}",
                    price_line.price_ref, cmd.event_id
                )));
            }

            lines.push(SessionLine::PriceRef {
                price: price_line.price_ref.clone(),
                quantity: price_line.quantity,
            });
            snapshot.push(NewOrderItem {
                name: ticket_type.name.clone(),
                unit_price: ticket_type.base_price,
                quantity: price_line.quantity as i32,
                ticket_type_id: Some(ticket_type.id),
            });
        }

        // The order id is minted first so the provider session carries it in
        // metadata; the row itself is only written after the session exists
        let order_id = Uuid::new_v4();

        let params = SessionParams {
            customer_email: cmd.customer_email.clone(),
            success_url: cmd
                .success_url
                .clone()
                .unwrap_or_else(|| self.default_success_url.clone()),
            cancel_url: cmd
                .cancel_url
                .clone()
                .unwrap_or_else(|| self.default_cancel_url.clone()),
            currency: self.currency.clone(),
            metadata: vec![
                ("order_id".to_string(), order_id.to_string()),
                ("event_id".to_string(), event.id.to_string()),
            ],
            lines,
        };

        let session = self.payments.create_checkout_session(&params).await?;

        let order = self
            .orders
            .create_pending_order(
                order_id,
                cmd.profile_id,
                &cmd.customer_email,
                &self.currency,
                &session.id,
                snapshot,
            )
            .await
            .map_err(|e| {
                // The remote session exists but has no local mirror; it will
                // expire unpaid. Log both ids for reconciliation.
                error!(
                    order_id = %order_id,
                    session_id = %session.id,
                    error = %e,
                    "Provider session created but pending order insert failed"
                );
                e
            })?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(DomainEvent::CheckoutSessionCreated {
                    order_id: order.id,
                    session_id: session.id.clone(),
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send checkout-session event");
            }
        }

        info!(order_id = %order.id, session_id = %session.id, "Checkout session created");

        Ok(CreatedSession {
            session_id: session.id,
            url: session.url,
            order_id: order.id,
        })
    }
}
