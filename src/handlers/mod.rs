pub mod checkout;
pub mod emails;
pub mod events;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod payment_webhooks;
pub mod profiles;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::payments::PaymentClient;
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::email::EmailService;
use crate::services::invoicing::InvoiceService;
use crate::services::issuance::IssuanceService;
use crate::services::orders::OrderService;
use crate::services::profiles::ProfileService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
    pub issuance: Arc<IssuanceService>,
    pub profiles: Arc<ProfileService>,
    pub email: Arc<EmailService>,
    pub invoices: Arc<InvoiceService>,
}

impl AppServices {
    /// Wires the service graph from the shared pool, event channel and
    /// provider clients.
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        payments: Arc<PaymentClient>,
        email: Arc<EmailService>,
        config: &AppConfig,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(db.clone(), Some(event_sender.clone())));
        let orders = Arc::new(OrderService::new(db.clone()));
        let profiles = Arc::new(ProfileService::new(
            db.clone(),
            email.clone(),
            Some(event_sender.clone()),
        ));
        let checkout = Arc::new(CheckoutService::new(
            payments,
            orders.clone(),
            catalog.clone(),
            profiles.clone(),
            Some(event_sender.clone()),
            config.default_currency.clone(),
            config.checkout_success_url(),
            config.checkout_cancel_url(),
        ));
        let issuance = Arc::new(IssuanceService::new(
            db,
            email.clone(),
            Some(event_sender),
        ));
        let invoices = Arc::new(InvoiceService::new(orders.clone()));

        Self {
            catalog,
            orders,
            checkout,
            issuance,
            profiles,
            email,
            invoices,
        }
    }
}
