use axum::{body::Bytes, extract::State, http::HeaderMap, response::Json};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::payments::{WebhookEnvelope, CHECKOUT_SESSION_COMPLETED};
use crate::{errors::ServiceError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Acknowledgement body expected by the payment provider
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// Inbound payment webhook. Signature verification runs against the raw body
/// before the JSON is trusted for anything; only a completed checkout session
/// triggers issuance, every other event type is acknowledged and ignored.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted", body = WebhookAck),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown order or event", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ServiceError> {
    let secret = &state.config.payment_webhook_secret;
    let tolerance = state.config.webhook_tolerance_secs();

    if !verify_signature(&headers, &body, secret, tolerance) {
        warn!("Payment webhook signature verification failed");
        return Err(ServiceError::Unauthorized(
            "invalid webhook signature".to_string(),
        ));
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid payload: {}", e)))?;

    if envelope.event_type != CHECKOUT_SESSION_COMPLETED {
        info!(
            event_id = %envelope.id,
            event_type = %envelope.event_type,
            "Ignoring unhandled webhook type"
        );
        return Ok(Json(WebhookAck { received: true }));
    }

    // Success is only acknowledged once issuance committed (or a previous
    // delivery already did); any failure surfaces non-2xx so the provider
    // retries
    state
        .services
        .issuance
        .process_completed_session(&envelope.data.object)
        .await?;

    Ok(Json(WebhookAck { received: true }))
}

/// Reconstructs the provider signature over `"{t}.{raw_body}"` and compares
/// it in constant time. The timestamp must be within `tolerance_secs` of now.
fn verify_signature(
    headers: &HeaderMap,
    payload: &[u8],
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    let Some(sig_header) = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    let mut ts = "";
    let mut v1 = "";
    for part in sig_header.split(',') {
        let mut it = part.trim().split('=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }
    if ts.is_empty() || v1.is_empty() {
        return false;
    }

    let Ok(ts_i) = ts.parse::<i64>() else {
        return false;
    };
    let now = chrono::Utc::now().timestamp();
    if (now - ts_i).unsigned_abs() > tolerance_secs {
        return false;
    }

    let Ok(body) = std::str::from_utf8(payload) else {
        return false;
    };
    let signed = format!("{}.{}", ts, body);
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, v1)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_test_8f2a61c4d5e6";

    fn sign(payload: &str, timestamp: i64, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn headers_for(payload: &str, timestamp: i64, secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("t={},v1={}", timestamp, sign(payload, timestamp, secret));
        headers.insert("Stripe-Signature", HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[test]
    fn valid_signature_passes() {
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let now = chrono::Utc::now().timestamp();
        let headers = headers_for(payload, now, SECRET);
        assert!(verify_signature(&headers, payload.as_bytes(), SECRET, 300));
    }

    #[test]
    fn tampered_payload_fails() {
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let now = chrono::Utc::now().timestamp();
        let headers = headers_for(payload, now, SECRET);
        let tampered = r#"{"id":"evt_2","type":"checkout.session.completed"}"#;
        assert!(!verify_signature(&headers, tampered.as_bytes(), SECRET, 300));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = r#"{"id":"evt_1"}"#;
        let now = chrono::Utc::now().timestamp();
        let headers = headers_for(payload, now, "whsec_other_secret_value");
        assert!(!verify_signature(&headers, payload.as_bytes(), SECRET, 300));
    }

    #[test]
    fn missing_header_fails() {
        let headers = HeaderMap::new();
        assert!(!verify_signature(&headers, b"{}", SECRET, 300));
    }

    #[test]
    fn stale_timestamp_fails() {
        let payload = r#"{"id":"evt_1"}"#;
        let old = chrono::Utc::now().timestamp() - 10_000;
        let headers = headers_for(payload, old, SECRET);
        assert!(!verify_signature(&headers, payload.as_bytes(), SECRET, 300));
    }

    #[test]
    fn malformed_header_fails() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Stripe-Signature",
            HeaderValue::from_static("not-a-signature"),
        );
        assert!(!verify_signature(&headers, b"{}", SECRET, 300));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
