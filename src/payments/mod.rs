//! Outbound client for the hosted payment provider.
//!
//! The provider owns pricing truth at capture time; this module only creates
//! hosted checkout sessions and converts between `Decimal` amounts and the
//! integer minor units the provider's API expects.

pub mod types;

use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::instrument;

use crate::errors::ServiceError;
pub use types::{
    CheckoutSession, CheckoutSessionObject, CustomerDetails, SessionLine, SessionParams,
    WebhookEnvelope, CHECKOUT_SESSION_COMPLETED,
};

/// Converts a decimal price to the provider's integer minor-unit
/// representation, rounding half-up.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    if amount < Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "monetary amount cannot be negative: {}",
            amount
        )));
    }
    let cents = (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    cents.to_i64().ok_or_else(|| {
        ServiceError::InvalidInput(format!("monetary amount out of range: {}", amount))
    })
}

/// Converts the provider's integer minor units back to a decimal amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Thin HTTP client for the provider's checkout-session API.
#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl PaymentClient {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to construct payment client: {}", e))
            })?;

        Ok(Self {
            http,
            secret_key: secret_key.into(),
            api_base: api_base.into(),
        })
    }

    /// Creates a hosted checkout session and returns its id and redirect URL.
    /// Leaves no local state behind; a failure here is purely remote.
    #[instrument(skip(self, params), fields(customer_email = %params.customer_email))]
    pub async fn create_checkout_session(
        &self,
        params: &SessionParams,
    ) -> Result<CheckoutSession, ServiceError> {
        let url = format!(
            "{}/v1/checkout/sessions",
            self.api_base.trim_end_matches('/')
        );
        let form = params.to_form();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalApiError(format!("payment provider request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ServiceError::ExternalApiError(format!("payment provider response unreadable: {}", e))
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<types::ProviderErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ServiceError::PaymentFailed(format!(
                "checkout session rejected ({}): {}",
                status, message
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ServiceError::ExternalApiError(format!(
                "payment provider returned malformed session: {}",
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn whole_amounts_convert_exactly() {
        assert_eq!(to_minor_units(dec!(45.00)).unwrap(), 4500);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
    }

    #[test]
    fn fractional_cents_round_half_up() {
        assert_eq!(to_minor_units(dec!(10.005)).unwrap(), 1001);
        assert_eq!(to_minor_units(dec!(10.004)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(7.4925)).unwrap(), 749);
        assert_eq!(to_minor_units(dec!(7.495)).unwrap(), 750);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(to_minor_units(dec!(-0.01)).is_err());
    }

    #[test]
    fn minor_units_round_trip() {
        assert_eq!(from_minor_units(4500), dec!(45.00));
        assert_eq!(from_minor_units(1), dec!(0.01));
        assert_eq!(to_minor_units(from_minor_units(123_456)).unwrap(), 123_456);
    }
}
