//! License Allocation Service - Main Application Entry Point
//!
//! This is a REST API server that turns confirmed payments into license
//! codes from a finite, pre-seeded pool. It guarantees each code is handed
//! out at most once and each paid transaction receives exactly one code,
//! no matter how often or how concurrently the claim request arrives.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries); the pool table is
//!   the only shared state, and all claim coordination happens there
//! - **Payment processor**: consumed over HTTP as an untrusted dependency
//! - **Format**: JSON requests/responses, permissive CORS for the
//!   browser-based checkout front end
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
mod store;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the application router over shared state.
fn app(state: AppState) -> Router {
    // Operator routes live behind the admin-key middleware
    let admin_routes = Router::new()
        .route("/api/v1/admin/pool", get(handlers::admin::pool_status))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    // The front end is a browser app on another origin, so the API answers
    // preflight requests and sends permissive CORS headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/checkout", post(handlers::checkout::create_checkout))
        .route(
            "/api/v1/licenses/claim",
            post(handlers::licenses::claim_license),
        )
        // Merge operator routes
        .merge(admin_routes)
        .layer(cors)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Build shared state: pool store, processor client, admin key digest
    let state = AppState {
        store: store::PgLicenseStore::new(pool),
        payments: services::payment_service::PaymentClient::new(&config)?,
        admin_key_hash: config
            .admin_api_key
            .as_deref()
            .map(middleware::auth::hash_key),
    };

    let router = app(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// State whose database pool connects lazily, so routes that fail
    /// before any query can be exercised without a running Postgres.
    fn test_state(admin_key: Option<&str>) -> AppState {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/licenses_test")
            .unwrap();

        let config = config::Config {
            database_url: "postgres://localhost/licenses_test".to_string(),
            server_port: 0,
            payment_secret_key: "sk_test_key".to_string(),
            payment_api_base: "http://127.0.0.1:9".to_string(),
            product_name: "Shoring Suite - 3 Month License".to_string(),
            product_tag: "shoring_suite_license".to_string(),
            product_amount_cents: 5000,
            product_currency: "usd".to_string(),
            admin_api_key: admin_key.map(str::to_string),
        };

        AppState {
            store: store::PgLicenseStore::new(pool),
            payments: services::payment_service::PaymentClient::new(&config).unwrap(),
            admin_key_hash: config
                .admin_api_key
                .as_deref()
                .map(middleware::auth::hash_key),
        }
    }

    async fn error_code(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn blank_transaction_id_is_rejected_before_any_lookup() {
        let response = app(test_state(None))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/licenses/claim")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"transaction_id": "   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");
    }

    #[tokio::test]
    async fn checkout_requires_an_origin_header() {
        let response = app(test_state(None))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/checkout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_reject_requests_without_a_configured_key() {
        let response = app(test_state(None))
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/admin/pool")
                    .header("Authorization", "Bearer anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "invalid_admin_key");
    }

    #[tokio::test]
    async fn admin_routes_reject_a_wrong_key() {
        let response = app(test_state(Some("right-key")))
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/admin/pool")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
