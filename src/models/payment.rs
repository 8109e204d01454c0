//! Payment processor data models.
//!
//! This module defines the wire types exchanged with the external payment
//! processor and the verified-payment value produced by the payment service.
//!
//! The processor is treated as an untrusted, possibly-slow dependency:
//! every optional field really is optional on the wire, and nothing here is
//! persisted. Transactions are owned by the processor and only observed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A checkout session as reported by the payment processor.
///
/// Subset of the processor's session object; fields this service does not
/// act on are ignored during deserialization.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "cs_test_a1b2c3",
///   "url": "https://checkout.example.com/pay/cs_test_a1b2c3",
///   "payment_status": "paid",
///   "amount_total": 5000,
///   "currency": "usd",
///   "metadata": { "product": "shoring_suite_license" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorSession {
    /// The processor-issued session identifier, used as the transaction id
    pub id: String,

    /// Hosted checkout page URL
    ///
    /// Present on freshly created sessions, absent once the session expires.
    #[serde(default)]
    pub url: Option<String>,

    /// Payment state: "paid", "unpaid", or "no_payment_required"
    ///
    /// Only "paid" releases a license code.
    pub payment_status: String,

    /// Total amount in the smallest currency unit (cents)
    #[serde(default)]
    pub amount_total: Option<i64>,

    /// Lowercase ISO 4217 currency code
    #[serde(default)]
    pub currency: Option<String>,

    /// Free-form key/value metadata attached at session creation
    ///
    /// This service stores the configured product tag under the
    /// "product" key and checks it back during verification.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A payment that has been confirmed against the configured product.
///
/// Produced only by the payment service after checking the processor-reported
/// status, amount, currency, and product metadata. Holding one of these is
/// the precondition for claiming a license code.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedPayment {
    /// The verified transaction identifier
    pub transaction_id: String,

    /// Confirmed amount in cents
    pub amount_cents: i64,

    /// Confirmed currency
    pub currency: String,
}

/// Request to start a checkout.
///
/// # JSON Example
///
/// ```json
/// {
///   "product": "shoring_suite_license"
/// }
/// ```
///
/// The body is optional; this service sells one configured product, so the
/// selector exists only to reject a front end asking for something else.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Product tag to purchase (defaults to the configured product)
    #[serde(default)]
    pub product: Option<String>,
}

/// Response returned when a checkout session is created.
///
/// # JSON Example
///
/// ```json
/// {
///   "checkout_url": "https://checkout.example.com/pay/cs_test_a1b2c3",
///   "transaction_id": "cs_test_a1b2c3"
/// }
/// ```
///
/// The front end redirects the customer to `checkout_url` and keeps
/// `transaction_id` to claim the license after the payment completes.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted payment page to redirect the customer to
    pub checkout_url: String,

    /// Processor-issued identifier for this checkout attempt
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_paid_session() {
        let session: ProcessorSession = serde_json::from_str(
            r#"{
                "id": "cs_test_a1b2c3",
                "payment_status": "paid",
                "amount_total": 5000,
                "currency": "usd",
                "metadata": { "product": "shoring_suite_license" }
            }"#,
        )
        .expect("valid session JSON");

        assert_eq!(session.id, "cs_test_a1b2c3");
        assert_eq!(session.payment_status, "paid");
        assert_eq!(session.amount_total, Some(5000));
        assert_eq!(session.metadata.get("product").map(String::as_str), Some("shoring_suite_license"));
        assert!(session.url.is_none());
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        // An expired or incomplete session can omit everything but id and status
        let session: ProcessorSession =
            serde_json::from_str(r#"{ "id": "cs_x", "payment_status": "unpaid" }"#)
                .expect("minimal session JSON");

        assert_eq!(session.amount_total, None);
        assert_eq!(session.currency, None);
        assert!(session.metadata.is_empty());
    }
}
