//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use anyhow::Context;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `PAYMENT_SECRET_KEY` (required): secret API key for the payment processor
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `PAYMENT_API_BASE` (optional): payment processor base URL, defaults to the live Stripe API
/// - `PRODUCT_NAME` / `PRODUCT_TAG` / `PRODUCT_AMOUNT_CENTS` / `PRODUCT_CURRENCY` (optional):
///   the single product this service sells; a paid transaction must match all of them
///   before a license code is released
/// - `ADMIN_API_KEY` (optional): bearer key for the operator inventory endpoint;
///   when unset, admin routes reject every request
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub payment_secret_key: String,

    #[serde(default = "default_payment_api_base")]
    pub payment_api_base: String,

    #[serde(default = "default_product_name")]
    pub product_name: String,

    #[serde(default = "default_product_tag")]
    pub product_tag: String,

    #[serde(default = "default_product_amount_cents")]
    pub product_amount_cents: i64,

    #[serde(default = "default_product_currency")]
    pub product_currency: String,

    #[serde(default)]
    pub admin_api_key: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default payment processor base URL.
fn default_payment_api_base() -> String {
    "https://api.stripe.com".to_string()
}

/// Default product display name shown on the hosted checkout page.
fn default_product_name() -> String {
    "Shoring Suite - 3 Month License".to_string()
}

/// Default product tag stored in checkout session metadata.
fn default_product_tag() -> String {
    "shoring_suite_license".to_string()
}

/// Default product price in cents ($50.00).
fn default_product_amount_cents() -> i64 {
    5000
}

/// Default product currency (lowercase ISO 4217, the processor's convention).
fn default_product_currency() -> String {
    "usd".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - PAYMENT_API_BASE is not a valid URL
    pub fn from_env() -> anyhow::Result<Self> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>().context("failed to load configuration")?;

        // Catch a malformed processor base URL at startup instead of on the
        // first outbound call
        url::Url::parse(&config.payment_api_base).with_context(|| {
            format!(
                "PAYMENT_API_BASE is not a valid URL: {}",
                config.payment_api_base
            )
        })?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_configured_product() {
        assert_eq!(default_port(), 3000);
        assert_eq!(default_payment_api_base(), "https://api.stripe.com");
        assert_eq!(default_product_amount_cents(), 5000);
        assert_eq!(default_product_currency(), "usd");
        assert_eq!(default_product_tag(), "shoring_suite_license");
    }
}
