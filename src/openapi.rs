use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Boxoffice API",
        version = "0.1.0",
        description = r#"
Event-ticketing backend.

The browser creates hosted checkout sessions, the payment provider calls the
signed webhook once a session completes, and tickets are issued exactly once
per session with a confirmation email. Invoices are rendered as PDF documents
on demand.
"#
    ),
    paths(
        crate::handlers::health::api_status,
        crate::handlers::health::health_check,
        crate::handlers::events::list_events,
        crate::handlers::events::get_event,
        crate::handlers::events::create_event,
        crate::handlers::events::list_ticket_types,
        crate::handlers::events::create_ticket_type,
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::payment_webhooks::payment_webhook,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::invoices::download_invoice,
        crate::handlers::profiles::create_profile,
        crate::handlers::profiles::get_profile,
        crate::handlers::profiles::update_verification,
        crate::handlers::emails::send_welcome,
        crate::handlers::emails::send_invoice,
        crate::handlers::emails::send_contact,
        crate::handlers::emails::send_verification,
    ),
    tags(
        (name = "Health", description = "Liveness and build metadata"),
        (name = "Events", description = "Event catalog and ticket types"),
        (name = "Checkout", description = "Hosted checkout sessions"),
        (name = "Payments", description = "Payment provider webhooks"),
        (name = "Orders", description = "Order reads for reconciliation"),
        (name = "Invoices", description = "PDF invoice rendering"),
        (name = "Profiles", description = "Purchaser profiles and verification"),
        (name = "Emails", description = "Transactional email senders"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs with the OpenAPI document at
/// /api-docs/openapi.json
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
