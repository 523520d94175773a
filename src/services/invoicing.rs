//! Server-side invoice rendering.
//!
//! Fixed layout (header, order metadata, line items, total); currency and
//! date formatting only, no business logic.

use std::io::BufWriter;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{order, order_item};
use crate::errors::ServiceError;
use crate::services::orders::OrderService;

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 20.0;
const LINE_HEIGHT_MM: f64 = 8.0;

/// A rendered invoice document
pub struct RenderedInvoice {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Renders invoice PDFs for orders
#[derive(Clone)]
pub struct InvoiceService {
    orders: Arc<OrderService>,
}

impl InvoiceService {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self { orders }
    }

    /// Renders the invoice for an order, or fails with 404 semantics when the
    /// order does not exist
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn render_for_order(&self, order_id: Uuid) -> Result<RenderedInvoice, ServiceError> {
        let (order, items) = self
            .orders
            .get_order_with_items(order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with ID {} not found", order_id))
            })?;

        let bytes = build_invoice_pdf(&order, &items)?;
        Ok(RenderedInvoice {
            filename: format!("invoice-{}.pdf", order.order_number),
            bytes,
        })
    }
}

/// Draws the fixed invoice layout into a PDF byte buffer
pub fn build_invoice_pdf(
    order: &order::Model,
    items: &[order_item::Model],
) -> Result<Vec<u8>, ServiceError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", order.order_number),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ServiceError::RenderError(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ServiceError::RenderError(e.to_string()))?;

    let current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    current.use_text(
        format!("Invoice {}", order.order_number),
        20.0,
        Mm(MARGIN_MM),
        Mm(y),
        &bold,
    );
    y -= LINE_HEIGHT_MM * 1.5;

    current.use_text(
        format!("Date: {}", format_date(order.created_at)),
        11.0,
        Mm(MARGIN_MM),
        Mm(y),
        &regular,
    );
    y -= LINE_HEIGHT_MM;

    current.use_text(
        format!("Billed to: {}", order.customer_email),
        11.0,
        Mm(MARGIN_MM),
        Mm(y),
        &regular,
    );
    y -= LINE_HEIGHT_MM;

    current.use_text(
        format!("Status: {}", order.status),
        11.0,
        Mm(MARGIN_MM),
        Mm(y),
        &regular,
    );
    y -= LINE_HEIGHT_MM * 2.0;

    // Column headers
    current.use_text("Item", 11.0, Mm(MARGIN_MM), Mm(y), &bold);
    current.use_text("Qty", 11.0, Mm(120.0), Mm(y), &bold);
    current.use_text("Unit", 11.0, Mm(140.0), Mm(y), &bold);
    current.use_text("Total", 11.0, Mm(170.0), Mm(y), &bold);
    y -= LINE_HEIGHT_MM;

    for item in items {
        let line_total = item.unit_price * Decimal::from(item.quantity);
        current.use_text(item.name.clone(), 11.0, Mm(MARGIN_MM), Mm(y), &regular);
        current.use_text(item.quantity.to_string(), 11.0, Mm(120.0), Mm(y), &regular);
        current.use_text(
            format_money(item.unit_price, &order.currency),
            11.0,
            Mm(140.0),
            Mm(y),
            &regular,
        );
        current.use_text(
            format_money(line_total, &order.currency),
            11.0,
            Mm(170.0),
            Mm(y),
            &regular,
        );
        y -= LINE_HEIGHT_MM;
    }

    y -= LINE_HEIGHT_MM;
    current.use_text(
        format!("Total: {}", format_money(order.total_amount, &order.currency)),
        14.0,
        Mm(120.0),
        Mm(y),
        &bold,
    );

    let mut bytes = Vec::new();
    {
        let mut writer = BufWriter::new(&mut bytes);
        doc.save(&mut writer)
            .map_err(|e| ServiceError::RenderError(e.to_string()))?;
    }
    Ok(bytes)
}

fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency.to_uppercase())
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order() -> (order::Model, Vec<order_item::Model>) {
        let order_id = Uuid::new_v4();
        let order = order::Model {
            id: order_id,
            order_number: "BOX-550E8400".into(),
            profile_id: None,
            customer_email: "alice@example.com".into(),
            checkout_session_id: Some("cs_test_1".into()),
            status: "paid".into(),
            total_amount: dec!(90.00),
            currency: "eur".into(),
            created_at: Utc::now(),
            updated_at: None,
            version: 2,
        };
        let items = vec![order_item::Model {
            id: Uuid::new_v4(),
            order_id,
            ticket_type_id: None,
            name: "Concert A".into(),
            unit_price: dec!(45.00),
            quantity: 2,
        }];
        (order, items)
    }

    #[test]
    fn rendered_document_is_a_pdf() {
        let (order, items) = sample_order();
        let bytes = build_invoice_pdf(&order, &items).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn rendering_handles_empty_item_lists() {
        let (order, _) = sample_order();
        let bytes = build_invoice_pdf(&order, &[]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
