//! Stripe integration: payment-intent creation and webhook verification
//!
//! The client speaks the form-encoded Stripe REST API directly over
//! reqwest. Webhook signatures are the `Stripe-Signature` scheme: an
//! HMAC-SHA256 of `"{timestamp}.{body}"` under the endpoint secret, with a
//! timestamp tolerance against replay.

use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Accepted clock skew between the signature timestamp and now
pub const SIGNATURE_TOLERANCE_SECONDS: u64 = 300;

/// Stripe credentials
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

/// Minimal Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
        }
    }

    /// Create a PaymentIntent for a booking. Amount is in the minor
    /// currency unit; booking and user ids ride along as metadata so the
    /// webhook can find the booking again.
    pub async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> Result<PaymentIntent> {
        info!("Creating payment intent for booking {}", booking_id);

        let amount = amount.to_string();
        let booking_id = booking_id.to_string();
        let user_id = user_id.to_string();

        let params: [(&str, &str); 6] = [
            ("amount", &amount),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[booking_id]", &booking_id),
            ("metadata[user_id]", &user_id),
            ("description", "Care.xyz booking"),
        ];

        let response = self
            .http
            .post(format!("{STRIPE_API_BASE}/payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Stripe payment_intents returned {}: {}",
                status,
                body
            ));
        }

        let intent: PaymentIntent = response.json().await?;
        Ok(intent)
    }
}

/// PaymentIntent response fields the service uses
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// A webhook event envelope
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: PaymentIntentObject,
}

/// The payment-intent object inside a `payment_intent.*` event
#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub charges: Option<ChargeList>,
}

#[derive(Debug, Deserialize)]
pub struct ChargeList {
    #[serde(default)]
    pub data: Vec<Charge>,
}

#[derive(Debug, Deserialize)]
pub struct Charge {
    pub receipt_url: Option<String>,
}

impl PaymentIntentObject {
    /// Receipt URL from the first charge, when the gateway includes one
    pub fn receipt_url(&self) -> Option<String> {
        self.charges
            .as_ref()
            .and_then(|charges| charges.data.first())
            .and_then(|charge| charge.receipt_url.clone())
    }
}

/// Why a webhook signature was rejected
#[derive(Debug, PartialEq)]
pub enum SignatureError {
    MalformedHeader,
    TimestampOutOfTolerance,
    NoMatchingSignature,
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::MalformedHeader => write!(f, "malformed Stripe-Signature header"),
            SignatureError::TimestampOutOfTolerance => {
                write!(f, "signature timestamp outside tolerance")
            }
            SignatureError::NoMatchingSignature => write!(f, "no matching v1 signature"),
        }
    }
}

/// Verify a `Stripe-Signature` header (`t=...,v1=...`) against the payload.
///
/// `now` is passed in rather than read from the clock so verification stays
/// a pure function.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
    now: u64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<u64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    if now.abs_diff(timestamp) > tolerance_seconds {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    for candidate in candidates {
        let Ok(bytes) = hex::decode(candidate) else {
            continue;
        };
        // verify_slice is constant-time over the digest comparison
        if mac.clone().verify_slice(&bytes).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::NoMatchingSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: u64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        )
    }

    #[test]
    fn accepts_a_valid_signature() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign(payload, 1_700_000_000);

        assert!(
            verify_signature(payload, &header, SECRET, SIGNATURE_TOLERANCE_SECONDS, 1_700_000_000)
                .is_ok()
        );
    }

    #[test]
    fn accepts_within_tolerance_rejects_outside() {
        let payload = b"{}";
        let header = sign(payload, 1_700_000_000);

        assert!(
            verify_signature(payload, &header, SECRET, 300, 1_700_000_299).is_ok()
        );
        assert_eq!(
            verify_signature(payload, &header, SECRET, 300, 1_700_000_301),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let header = sign(b"{\"amount\":150000}", 1_700_000_000);

        assert_eq!(
            verify_signature(
                b"{\"amount\":999999}",
                &header,
                SECRET,
                300,
                1_700_000_000
            ),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn rejects_a_wrong_secret() {
        let payload = b"{}";
        let header = sign(payload, 1_700_000_000);

        assert_eq!(
            verify_signature(payload, &header, "whsec_other", 300, 1_700_000_000),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        for header in ["", "t=abc,v1=00", "v1=00", "t=1700000000"] {
            assert_eq!(
                verify_signature(b"{}", header, SECRET, 300, 1_700_000_000),
                Err(SignatureError::MalformedHeader),
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn accepts_any_matching_v1_among_several() {
        let payload = b"{}";
        let timestamp = 1_700_000_000;
        let good = sign(payload, timestamp);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", timestamp, "00ab", good_sig);

        assert!(verify_signature(payload, &header, SECRET, 300, timestamp).is_ok());
    }

    #[test]
    fn parses_a_succeeded_event() {
        let body = r#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_123",
                    "amount": 150000,
                    "currency": "bdt",
                    "status": "succeeded",
                    "metadata": {
                        "booking_id": "7e57d004-2b97-0e7a-b45f-5387367791cd",
                        "user_id": "9e107d9d-372b-b682-5d9b-2ea9b0f0b91c"
                    },
                    "charges": {
                        "data": [{"receipt_url": "https://pay.stripe.com/receipts/x"}]
                    }
                }
            }
        }"#;

        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object.amount, 150000);
        assert_eq!(event.data.object.currency, "bdt");
        assert_eq!(
            event.data.object.metadata.get("booking_id").unwrap(),
            "7e57d004-2b97-0e7a-b45f-5387367791cd"
        );
        assert_eq!(
            event.data.object.receipt_url().as_deref(),
            Some("https://pay.stripe.com/receipts/x")
        );
    }

    #[test]
    fn event_without_charges_has_no_receipt() {
        let body = r#"{
            "id": "evt_2",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_456",
                    "amount": 50000,
                    "currency": "bdt",
                    "status": "succeeded"
                }
            }
        }"#;

        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert!(event.data.object.receipt_url().is_none());
        assert!(event.data.object.metadata.is_empty());
    }
}
