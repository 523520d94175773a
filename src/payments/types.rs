use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The only webhook type that triggers ticket issuance
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A line on a hosted checkout session: either ad-hoc price data or a
/// pre-registered provider price reference.
#[derive(Debug, Clone)]
pub enum SessionLine {
    PriceData {
        name: String,
        unit_amount: i64,
        quantity: u32,
    },
    PriceRef {
        price: String,
        quantity: u32,
    },
}

/// Parameters for creating a hosted checkout session
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub metadata: Vec<(String, String)>,
    pub lines: Vec<SessionLine>,
}

impl SessionParams {
    /// Flattens the parameters into the provider's form-encoded wire shape.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("customer_email".to_string(), self.customer_email.clone()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        for (i, line) in self.lines.iter().enumerate() {
            match line {
                SessionLine::PriceData {
                    name,
                    unit_amount,
                    quantity,
                } => {
                    form.push((
                        format!("line_items[{}][price_data][currency]", i),
                        self.currency.clone(),
                    ));
                    form.push((
                        format!("line_items[{}][price_data][product_data][name]", i),
                        name.clone(),
                    ));
                    form.push((
                        format!("line_items[{}][price_data][unit_amount]", i),
                        unit_amount.to_string(),
                    ));
                    form.push((format!("line_items[{}][quantity]", i), quantity.to_string()));
                }
                SessionLine::PriceRef { price, quantity } => {
                    form.push((format!("line_items[{}][price]", i), price.clone()));
                    form.push((format!("line_items[{}][quantity]", i), quantity.to_string()));
                }
            }
        }

        form
    }
}

/// Provider response for a created checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page; absent once the session is consumed
    #[serde(default)]
    pub url: Option<String>,
}

/// Error body returned by the provider on a rejected call
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: ProviderErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorDetails {
    #[serde(default)]
    pub message: String,
}

/// Envelope of an inbound webhook notification
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: CheckoutSessionObject,
}

/// The session object carried by a completed-checkout notification
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CheckoutSessionObject {
    /// Purchaser email as captured by the provider
    pub fn purchaser_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }

    /// Purchaser display name, when the provider captured one
    pub fn purchaser_name(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_params_flatten_price_data_lines() {
        let params = SessionParams {
            customer_email: "alice@example.com".into(),
            success_url: "https://shop.test/success".into(),
            cancel_url: "https://shop.test/cancel".into(),
            currency: "eur".into(),
            metadata: vec![("order_id".into(), "ord-1".into())],
            lines: vec![SessionLine::PriceData {
                name: "Concert A".into(),
                unit_amount: 4500,
                quantity: 2,
            }],
        };

        let form = params.to_form();
        assert!(form.contains(&("mode".into(), "payment".into())));
        assert!(form.contains(&("metadata[order_id]".into(), "ord-1".into())));
        assert!(form.contains(&(
            "line_items[0][price_data][product_data][name]".into(),
            "Concert A".into()
        )));
        assert!(form.contains(&("line_items[0][price_data][unit_amount]".into(), "4500".into())));
        assert!(form.contains(&("line_items[0][quantity]".into(), "2".into())));
    }

    #[test]
    fn session_params_flatten_price_ref_lines() {
        let params = SessionParams {
            customer_email: "bob@example.com".into(),
            success_url: "https://shop.test/success".into(),
            cancel_url: "https://shop.test/cancel".into(),
            currency: "eur".into(),
            metadata: vec![],
            lines: vec![SessionLine::PriceRef {
                price: "price_123".into(),
                quantity: 3,
            }],
        };

        let form = params.to_form();
        assert!(form.contains(&("line_items[0][price]".into(), "price_123".into())));
        assert!(form.contains(&("line_items[0][quantity]".into(), "3".into())));
    }

    #[test]
    fn webhook_envelope_deserializes_completed_session() {
        let payload = serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_42",
                    "amount_total": 4500,
                    "currency": "eur",
                    "customer_details": {"email": "alice@example.com", "name": "Alice"},
                    "payment_status": "paid",
                    "metadata": {"order_id": "11111111-2222-3333-4444-555555555555"}
                }
            }
        });

        let envelope: WebhookEnvelope = serde_json::from_value(payload).unwrap();
        assert_eq!(envelope.event_type, CHECKOUT_SESSION_COMPLETED);
        let session = &envelope.data.object;
        assert_eq!(session.id, "cs_test_42");
        assert_eq!(session.amount_total, Some(4500));
        assert_eq!(session.purchaser_email(), Some("alice@example.com"));
        assert_eq!(session.purchaser_name(), Some("Alice"));
        assert_eq!(
            session.metadata.get("order_id").map(String::as_str),
            Some("11111111-2222-3333-4444-555555555555")
        );
    }
}
