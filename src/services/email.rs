//! Transactional email: template rendering plus a single delegated send.
//!
//! Delivery goes through the hosted email API or an SMTP relay depending on
//! configuration. There is no retry here; callers decide what a transport
//! failure means (the webhook isolates it, form handlers surface it).

use std::time::Duration;

use askama::Template;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::EmailConfig;
use crate::entities::{event, order, order_item, ticket};
use crate::errors::ServiceError;

/// One ticket row inside the confirmation email
pub struct TicketEmailLine {
    pub token: String,
    pub qr_url: String,
    pub price: String,
}

/// One line inside the invoice email
pub struct InvoiceEmailLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Template)]
#[template(path = "email/ticket_confirmation.html")]
struct TicketConfirmationHtml<'a> {
    holder_name: &'a str,
    event_title: &'a str,
    event_date: &'a str,
    event_location: &'a str,
    tickets: &'a [TicketEmailLine],
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/invoice.html")]
struct InvoiceHtml<'a> {
    order_number: &'a str,
    order_date: &'a str,
    total: &'a str,
    lines: &'a [InvoiceEmailLine],
}

#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactHtml<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "email/verification_status.html")]
struct VerificationStatusHtml<'a> {
    name: &'a str,
    status: &'a str,
    verified: bool,
}

#[derive(Deserialize)]
struct ApiSendResponse {
    id: String,
}

enum Transport {
    Api {
        http: reqwest::Client,
        api_key: String,
        api_base: String,
    },
    Smtp {
        mailer: AsyncSmtpTransport<Tokio1Executor>,
    },
}

/// Email service for all transactional mail
pub struct EmailService {
    transport: Transport,
    from_address: String,
    /// Inbox receiving contact-form submissions
    contact_inbox: String,
}

impl EmailService {
    /// Builds the service from configuration. Transport credentials were
    /// validated at startup, so a missing key here is a hard error.
    pub fn from_config(config: &EmailConfig) -> Result<Self, ServiceError> {
        let transport = match config.transport.to_ascii_lowercase().as_str() {
            "smtp" => {
                let host = config.smtp_host.as_deref().ok_or_else(|| {
                    ServiceError::InternalError("SMTP transport requires a host".to_string())
                })?;
                let username = config.smtp_username.clone().ok_or_else(|| {
                    ServiceError::InternalError("SMTP transport requires a username".to_string())
                })?;
                let password = config.smtp_password.clone().ok_or_else(|| {
                    ServiceError::InternalError("SMTP transport requires a password".to_string())
                })?;

                let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| {
                        ServiceError::InternalError(format!("Failed to build SMTP relay: {}", e))
                    })?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(username, password))
                    .build();

                Transport::Smtp { mailer }
            }
            _ => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    ServiceError::InternalError(
                        "Hosted email transport requires an API key".to_string(),
                    )
                })?;
                let http = reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()
                    .map_err(|e| {
                        ServiceError::InternalError(format!(
                            "Failed to construct email client: {}",
                            e
                        ))
                    })?;
                Transport::Api {
                    http,
                    api_key,
                    api_base: config.api_base.clone(),
                }
            }
        };

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
            contact_inbox: config.from_address.clone(),
        })
    }

    /// Welcome email after account creation
    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<String, ServiceError> {
        let html = WelcomeHtml { name }
            .render()
            .map_err(|e| ServiceError::RenderError(e.to_string()))?;
        self.deliver(to, "Welcome to the box office", html).await
    }

    /// Verification-status email sent on every status transition
    pub async fn send_verification_status(
        &self,
        to: &str,
        name: &str,
        status: &str,
    ) -> Result<String, ServiceError> {
        let html = VerificationStatusHtml {
            name,
            status,
            verified: status == "verified",
        }
        .render()
        .map_err(|e| ServiceError::RenderError(e.to_string()))?;
        self.deliver(to, "Your profile verification was reviewed", html)
            .await
    }

    /// Contact-form submission forwarded to the configured inbox
    pub async fn send_contact_message(
        &self,
        name: &str,
        reply_email: &str,
        message: &str,
    ) -> Result<String, ServiceError> {
        let html = ContactHtml {
            name,
            email: reply_email,
            message,
        }
        .render()
        .map_err(|e| ServiceError::RenderError(e.to_string()))?;
        let inbox = self.contact_inbox.clone();
        self.deliver(&inbox, &format!("Contact form: {}", name), html)
            .await
    }

    /// Invoice email for a paid order
    pub async fn send_invoice(
        &self,
        to: &str,
        order: &order::Model,
        items: &[order_item::Model],
    ) -> Result<String, ServiceError> {
        let lines: Vec<InvoiceEmailLine> = items
            .iter()
            .map(|item| InvoiceEmailLine {
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: format_money(item.unit_price, &order.currency),
                line_total: format_money(
                    item.unit_price * Decimal::from(item.quantity),
                    &order.currency,
                ),
            })
            .collect();

        let html = InvoiceHtml {
            order_number: &order.order_number,
            order_date: &format_date(order.created_at),
            total: &format_money(order.total_amount, &order.currency),
            lines: &lines,
        }
        .render()
        .map_err(|e| ServiceError::RenderError(e.to_string()))?;

        self.deliver(to, &format!("Invoice {}", order.order_number), html)
            .await
    }

    /// Ticket confirmation with one QR reference per issued ticket
    pub async fn send_ticket_confirmation(
        &self,
        to: &str,
        holder_name: &str,
        event: &event::Model,
        currency: &str,
        tickets: &[ticket::Model],
    ) -> Result<String, ServiceError> {
        let lines: Vec<TicketEmailLine> = tickets
            .iter()
            .map(|t| TicketEmailLine {
                token: t.qr_token.clone(),
                qr_url: qr_image_url(&t.qr_token),
                price: format_money(t.final_price, currency),
            })
            .collect();

        let html = TicketConfirmationHtml {
            holder_name,
            event_title: &event.title,
            event_date: &format_date(event.event_date),
            event_location: &event.location,
            tickets: &lines,
        }
        .render()
        .map_err(|e| ServiceError::RenderError(e.to_string()))?;

        self.deliver(to, &format!("Your tickets for {}", event.title), html)
            .await
    }

    /// Single delegated send. Returns the provider's message id.
    #[instrument(skip(self, html), fields(to = %to, subject = %subject))]
    async fn deliver(&self, to: &str, subject: &str, html: String) -> Result<String, ServiceError> {
        match &self.transport {
            Transport::Api {
                http,
                api_key,
                api_base,
            } => {
                let url = format!("{}/emails", api_base.trim_end_matches('/'));
                let response = http
                    .post(&url)
                    .bearer_auth(api_key)
                    .json(&json!({
                        "from": self.from_address,
                        "to": [to],
                        "subject": subject,
                        "html": html,
                    }))
                    .send()
                    .await
                    .map_err(|e| {
                        ServiceError::EmailError(format!("email provider request failed: {}", e))
                    })?;

                let status = response.status();
                let body = response.text().await.map_err(|e| {
                    ServiceError::EmailError(format!("email provider response unreadable: {}", e))
                })?;

                if !status.is_success() {
                    return Err(ServiceError::EmailError(format!(
                        "email provider rejected the send ({}): {}",
                        status, body
                    )));
                }

                let parsed: ApiSendResponse = serde_json::from_str(&body).map_err(|e| {
                    ServiceError::EmailError(format!("email provider returned malformed id: {}", e))
                })?;

                info!(id = %parsed.id, "Email sent");
                Ok(parsed.id)
            }
            Transport::Smtp { mailer } => {
                let message = Message::builder()
                    .from(self.from_address.parse().map_err(|_| {
                        ServiceError::EmailError(format!(
                            "invalid sender address: {}",
                            self.from_address
                        ))
                    })?)
                    .to(to.parse().map_err(|_| {
                        ServiceError::EmailError(format!("invalid recipient address: {}", to))
                    })?)
                    .subject(subject)
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    )
                    .map_err(|e| {
                        ServiceError::EmailError(format!("failed to build message: {}", e))
                    })?;

                mailer
                    .send(message)
                    .await
                    .map_err(|e| ServiceError::EmailError(format!("SMTP send failed: {}", e)))?;

                let id = format!("smtp-{}", Uuid::new_v4());
                info!(id = %id, "Email sent");
                Ok(id)
            }
        }
    }
}

/// QR image reference embedded in the confirmation email; the token itself is
/// the scan payload
fn qr_image_url(token: &str) -> String {
    format!(
        "https://api.qrserver.com/v1/create-qr-code/?size=240x240&data={}",
        token
    )
}

fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency.to_uppercase())
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_and_date_formatting() {
        assert_eq!(format_money(dec!(45), "eur"), "45.00 EUR");
        assert_eq!(format_money(dec!(7.5), "usd"), "7.50 USD");
    }

    #[test]
    fn qr_url_embeds_the_token() {
        let url = qr_image_url("abc123");
        assert!(url.contains("data=abc123"));
    }

    #[test]
    fn ticket_confirmation_template_renders_all_tickets() {
        let lines = vec![
            TicketEmailLine {
                token: "tok-one".into(),
                qr_url: qr_image_url("tok-one"),
                price: "36.00 EUR".into(),
            },
            TicketEmailLine {
                token: "tok-two".into(),
                qr_url: qr_image_url("tok-two"),
                price: "36.00 EUR".into(),
            },
        ];
        let html = TicketConfirmationHtml {
            holder_name: "Alice",
            event_title: "Concert A",
            event_date: "01/09/2026 20:00",
            event_location: "Lyon",
            tickets: &lines,
        }
        .render()
        .unwrap();

        assert!(html.contains("Alice"));
        assert!(html.contains("Concert A"));
        assert!(html.contains("tok-one"));
        assert!(html.contains("tok-two"));
        assert!(html.contains("36.00 EUR"));
    }

    #[test]
    fn verification_template_distinguishes_outcomes() {
        let approved = VerificationStatusHtml {
            name: "Alice",
            status: "verified",
            verified: true,
        }
        .render()
        .unwrap();
        assert!(approved.contains("approved"));

        let rejected = VerificationStatusHtml {
            name: "Alice",
            status: "rejected",
            verified: false,
        }
        .render()
        .unwrap();
        assert!(rejected.contains("rejected"));
    }

    #[test]
    fn invoice_template_lists_lines_and_total() {
        let lines = vec![InvoiceEmailLine {
            name: "Concert A".into(),
            quantity: 2,
            unit_price: "45.00 EUR".into(),
            line_total: "90.00 EUR".into(),
        }];
        let html = InvoiceHtml {
            order_number: "BOX-550E8400",
            order_date: "01/08/2026 10:00",
            total: "90.00 EUR",
            lines: &lines,
        }
        .render()
        .unwrap();

        assert!(html.contains("BOX-550E8400"));
        assert!(html.contains("Concert A"));
        assert!(html.contains("90.00 EUR"));
    }
}
