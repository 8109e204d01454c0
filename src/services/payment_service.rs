//! Payment verifier - adapter for the external payment processor.
//!
//! This service handles:
//! - Creating hosted checkout sessions (delegation, not part of the core)
//! - Looking up a transaction's current payment status
//! - Accepting only paid transactions that match the configured product
//!
//! # Trust Model
//!
//! The processor is untrusted, possibly slow, possibly unavailable. Every
//! call has a bounded timeout, the status lookup gets one retry on transient
//! transport failure, and nothing here has side effects on our own store.

use crate::config::Config;
use crate::error::AppError;
use crate::models::payment::{CheckoutResponse, ProcessorSession, VerifiedPayment};

/// Payment status value that releases a license code.
const PAYMENT_STATUS_PAID: &str = "paid";

/// Metadata key carrying the product tag on checkout sessions.
const METADATA_PRODUCT_KEY: &str = "product";

/// Timeout applied to every outbound processor call.
const PROCESSOR_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// The product a paid transaction must match before a code is released.
///
/// Loaded from configuration once at startup. A paid session whose amount,
/// currency, or metadata tag differs is rejected, never allocated for.
#[derive(Debug, Clone)]
pub struct ExpectedProduct {
    /// Display name shown on the hosted checkout page
    name: String,

    /// Tag written into session metadata and checked back at verification
    tag: String,

    /// Price in cents
    amount_cents: i64,

    /// Lowercase ISO 4217 currency code
    currency: String,
}

impl ExpectedProduct {
    /// Whether a processor-reported session matches this product.
    ///
    /// All three of amount, currency, and metadata tag must agree. Currency
    /// comparison ignores case since processors report lowercase codes.
    fn matches(&self, session: &ProcessorSession) -> bool {
        let amount_ok = session.amount_total == Some(self.amount_cents);
        let currency_ok = session
            .currency
            .as_deref()
            .is_some_and(|currency| currency.eq_ignore_ascii_case(&self.currency));
        let tag_ok = session
            .metadata
            .get(METADATA_PRODUCT_KEY)
            .is_some_and(|tag| *tag == self.tag);

        amount_ok && currency_ok && tag_ok
    }
}

/// HTTP client for the payment processor.
///
/// Wraps a single `reqwest::Client` (connection pooling, bounded timeout)
/// plus the processor base URL, secret key, and product expectations.
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    product: ExpectedProduct,
}

impl PaymentClient {
    /// Build the processor client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(PROCESSOR_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base: config.payment_api_base.trim_end_matches('/').to_string(),
            secret_key: config.payment_secret_key.clone(),
            product: ExpectedProduct {
                name: config.product_name.clone(),
                tag: config.product_tag.clone(),
                amount_cents: config.product_amount_cents,
                currency: config.product_currency.clone(),
            },
        })
    }

    /// Tag of the product this deployment sells.
    pub fn product_tag(&self) -> &str {
        &self.product.tag
    }

    /// Create a hosted checkout session for the configured product.
    ///
    /// # Process
    ///
    /// 1. POST `/v1/checkout/sessions` (form-encoded, the processor's wire
    ///    format) with one line item for the configured product
    /// 2. Tag the session metadata so verification can match it back
    /// 3. Return the hosted page URL and the session id
    ///
    /// Success and cancel URLs send the customer back to the calling origin;
    /// the success URL carries the session id placeholder the processor
    /// substitutes on redirect.
    ///
    /// # Errors
    ///
    /// - `PaymentProviderUnavailable`: the processor could not be reached
    /// - `PaymentProvider`: the processor rejected the request or answered
    ///   without a checkout URL
    pub async fn create_checkout_session(
        &self,
        origin: &str,
    ) -> Result<CheckoutResponse, AppError> {
        let success_url = format!("{origin}/?success=true&session_id={{CHECKOUT_SESSION_ID}}");
        let cancel_url = format!("{origin}/?canceled=true");

        let params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (
                "payment_method_types[1]".to_string(),
                "us_bank_account".to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                self.product.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                self.product.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                self.product.name.clone(),
            ),
            ("success_url".to_string(), success_url),
            ("cancel_url".to_string(), cancel_url),
            (
                format!("metadata[{METADATA_PRODUCT_KEY}]"),
                self.product.tag.clone(),
            ),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|err| {
                tracing::error!("Checkout session creation failed: {}", err);
                AppError::PaymentProviderUnavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::PaymentProvider(format!(
                "checkout session creation returned status {status}"
            )));
        }

        let session: ProcessorSession = response.json().await.map_err(|err| {
            AppError::PaymentProvider(format!("malformed checkout session response: {err}"))
        })?;

        let checkout_url = session.url.ok_or_else(|| {
            AppError::PaymentProvider("no checkout URL returned".to_string())
        })?;

        tracing::info!("Created checkout session {}", session.id);

        Ok(CheckoutResponse {
            checkout_url,
            transaction_id: session.id,
        })
    }

    /// Look up a checkout session's current state at the processor.
    ///
    /// Transient transport failures (connect errors, timeouts) get exactly
    /// one retry; the lookup is a pure read, so retrying is safe.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound`: the processor has no record of the id
    /// - `PaymentProviderUnavailable`: both attempts failed in transport
    /// - `PaymentProvider`: unexpected status or undecodable body
    pub async fn lookup_session(
        &self,
        transaction_id: &str,
    ) -> Result<ProcessorSession, AppError> {
        let mut response = self.fetch_session(transaction_id).await;

        if let Err(err) = &response {
            if is_transient(err) {
                tracing::warn!(
                    "Status lookup for {} failed in transport ({}), retrying once",
                    transaction_id,
                    err
                );
                response = self.fetch_session(transaction_id).await;
            }
        }

        let response = response.map_err(|err| {
            tracing::error!("Status lookup for {} failed: {}", transaction_id, err);
            AppError::PaymentProviderUnavailable
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::TransactionNotFound);
        }
        if !status.is_success() {
            return Err(AppError::PaymentProvider(format!(
                "session lookup returned status {status}"
            )));
        }

        response.json::<ProcessorSession>().await.map_err(|err| {
            AppError::PaymentProvider(format!("malformed session response: {err}"))
        })
    }

    /// Verify that a transaction is paid and matches the configured product.
    ///
    /// Purely a read-through check with no side effects; safe to call any
    /// number of times for the same transaction.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound`: unknown transaction identifier
    /// - `PaymentNotCompleted`: any non-paid status
    /// - `ProductMismatch`: paid, but amount/currency/product tag differ
    /// - `PaymentProviderUnavailable` / `PaymentProvider`: lookup failed
    pub async fn verify(&self, transaction_id: &str) -> Result<VerifiedPayment, AppError> {
        let session = self.lookup_session(transaction_id).await?;

        if session.payment_status != PAYMENT_STATUS_PAID {
            tracing::info!(
                "Transaction {} has payment status {:?}, rejecting claim",
                transaction_id,
                session.payment_status
            );
            return Err(AppError::PaymentNotCompleted);
        }

        if !self.product.matches(&session) {
            tracing::warn!(
                "Paid transaction {} does not match the configured product",
                transaction_id
            );
            return Err(AppError::ProductMismatch);
        }

        Ok(VerifiedPayment {
            transaction_id: session.id,
            amount_cents: self.product.amount_cents,
            currency: self.product.currency.clone(),
        })
    }

    /// Single GET of the session resource, no retry.
    async fn fetch_session(
        &self,
        transaction_id: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.api_base, transaction_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
    }
}

/// Whether a transport error is worth one retry.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Path, http::StatusCode, response::IntoResponse, routing::get};
    use serde_json::json;
    use std::collections::HashMap;

    fn expected_product() -> ExpectedProduct {
        ExpectedProduct {
            name: "Shoring Suite - 3 Month License".to_string(),
            tag: "shoring_suite_license".to_string(),
            amount_cents: 5000,
            currency: "usd".to_string(),
        }
    }

    fn paid_session() -> ProcessorSession {
        ProcessorSession {
            id: "cs_test_paid".to_string(),
            url: None,
            payment_status: "paid".to_string(),
            amount_total: Some(5000),
            currency: Some("usd".to_string()),
            metadata: HashMap::from([(
                "product".to_string(),
                "shoring_suite_license".to_string(),
            )]),
        }
    }

    #[test]
    fn matching_checks_amount_currency_and_tag() {
        let product = expected_product();
        assert!(product.matches(&paid_session()));

        let mut wrong_amount = paid_session();
        wrong_amount.amount_total = Some(4999);
        assert!(!product.matches(&wrong_amount));

        let mut wrong_currency = paid_session();
        wrong_currency.currency = Some("eur".to_string());
        assert!(!product.matches(&wrong_currency));

        let mut missing_tag = paid_session();
        missing_tag.metadata.clear();
        assert!(!product.matches(&missing_tag));
    }

    #[test]
    fn currency_comparison_ignores_case() {
        let product = expected_product();
        let mut session = paid_session();
        session.currency = Some("USD".to_string());
        assert!(product.matches(&session));
    }

    /// Serve a fake processor on a local port and return its base URL.
    async fn spawn_processor() -> String {
        let app = Router::new().route(
            "/v1/checkout/sessions/{id}",
            get(|Path(id): Path<String>| async move {
                match id.as_str() {
                    "cs_paid" => Json(json!({
                        "id": "cs_paid",
                        "payment_status": "paid",
                        "amount_total": 5000,
                        "currency": "usd",
                        "metadata": { "product": "shoring_suite_license" }
                    }))
                    .into_response(),
                    "cs_unpaid" => Json(json!({
                        "id": "cs_unpaid",
                        "payment_status": "unpaid",
                        "amount_total": 5000,
                        "currency": "usd",
                        "metadata": { "product": "shoring_suite_license" }
                    }))
                    .into_response(),
                    "cs_wrong_product" => Json(json!({
                        "id": "cs_wrong_product",
                        "payment_status": "paid",
                        "amount_total": 9900,
                        "currency": "usd",
                        "metadata": { "product": "some_other_product" }
                    }))
                    .into_response(),
                    _ => StatusCode::NOT_FOUND.into_response(),
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    fn client_for(base: String) -> PaymentClient {
        PaymentClient {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(2))
                .build()
                .unwrap(),
            api_base: base,
            secret_key: "sk_test_key".to_string(),
            product: expected_product(),
        }
    }

    #[tokio::test]
    async fn verify_accepts_a_paid_matching_session() {
        let client = client_for(spawn_processor().await);

        let verified = client.verify("cs_paid").await.unwrap();
        assert_eq!(verified.transaction_id, "cs_paid");
        assert_eq!(verified.amount_cents, 5000);
        assert_eq!(verified.currency, "usd");
    }

    #[tokio::test]
    async fn verify_rejects_unpaid_and_mismatched_sessions() {
        let client = client_for(spawn_processor().await);

        assert!(matches!(
            client.verify("cs_unpaid").await.unwrap_err(),
            AppError::PaymentNotCompleted
        ));
        assert!(matches!(
            client.verify("cs_wrong_product").await.unwrap_err(),
            AppError::ProductMismatch
        ));
        assert!(matches!(
            client.verify("cs_unknown").await.unwrap_err(),
            AppError::TransactionNotFound
        ));
    }
}
