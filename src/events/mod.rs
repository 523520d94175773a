use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the services after a state change commits. The processor
/// records every outcome so nothing in the pipeline is fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    // Catalog events
    EventCreated(Uuid),
    TicketTypeCreated {
        event_id: Uuid,
        ticket_type_id: Uuid,
    },

    // Checkout events
    CheckoutSessionCreated {
        order_id: Uuid,
        session_id: String,
    },
    OrderPaid {
        order_id: Uuid,
        session_id: String,
    },

    // Issuance events
    TicketsIssued {
        order_id: Uuid,
        event_id: Uuid,
        count: u32,
    },

    // Email events
    EmailDispatched {
        kind: String,
        recipient: String,
    },
    EmailFailed {
        kind: String,
        recipient: String,
        reason: String,
    },

    // Profile events
    ProfileVerificationChanged {
        profile_id: Uuid,
        status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<DomainEvent>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<DomainEvent>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: DomainEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging every event with enough context for
/// manual reconciliation. Runs for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<DomainEvent>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            DomainEvent::EventCreated(id) => {
                info!(event_id = %id, "Event created");
            }
            DomainEvent::TicketTypeCreated {
                event_id,
                ticket_type_id,
            } => {
                info!(event_id = %event_id, ticket_type_id = %ticket_type_id, "Ticket type created");
            }
            DomainEvent::CheckoutSessionCreated {
                order_id,
                session_id,
            } => {
                info!(order_id = %order_id, session_id = %session_id, "Checkout session created");
            }
            DomainEvent::OrderPaid {
                order_id,
                session_id,
            } => {
                info!(order_id = %order_id, session_id = %session_id, "Order paid");
            }
            DomainEvent::TicketsIssued {
                order_id,
                event_id,
                count,
            } => {
                info!(order_id = %order_id, event_id = %event_id, count, "Tickets issued");
            }
            DomainEvent::EmailDispatched { kind, recipient } => {
                info!(kind = %kind, recipient = %recipient, "Email dispatched");
            }
            DomainEvent::EmailFailed {
                kind,
                recipient,
                reason,
            } => {
                warn!(kind = %kind, recipient = %recipient, reason = %reason, "Email delivery failed");
            }
            DomainEvent::ProfileVerificationChanged { profile_id, status } => {
                info!(profile_id = %profile_id, status = %status, "Profile verification changed");
            }
        }
    }
    info!("Event processor stopped: channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_events_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let order_id = Uuid::new_v4();
        sender
            .send(DomainEvent::CheckoutSessionCreated {
                order_id,
                session_id: "cs_test_123".into(),
            })
            .await
            .unwrap();
        sender
            .send(DomainEvent::OrderPaid {
                order_id,
                session_id: "cs_test_123".into(),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(DomainEvent::CheckoutSessionCreated { session_id, .. }) => {
                assert_eq!(session_id, "cs_test_123");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(rx.recv().await, Some(DomainEvent::OrderPaid { .. })));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender
            .send(DomainEvent::EventCreated(Uuid::new_v4()))
            .await
            .is_err());
    }
}
