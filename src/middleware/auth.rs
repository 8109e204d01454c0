//! Admin key authentication middleware.
//!
//! This middleware intercepts every admin request to:
//! 1. Extract the admin key from the Authorization header
//! 2. Hash it and compare against the configured key's hash
//! 3. Reject unauthorized requests with HTTP 401
//!
//! When no admin key is configured, every admin request is rejected; the
//! operator surface simply does not exist on that deployment.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::{error::AppError, state::AppState};

/// SHA-256 hex digest of a key.
///
/// The configured admin key is hashed once at startup and presented keys
/// are hashed per request, so the plaintext key never sits in state.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Admin key authentication middleware function.
///
/// # Flow
///
/// 1. Require a configured admin key; otherwise reject
/// 2. Extract `Authorization: Bearer <key>` header from request
/// 3. Hash the `<key>` using SHA-256
/// 4. If the digest matches the configured key's digest, call next handler
/// 5. Otherwise return 401 Unauthorized
///
/// # Headers
///
/// Expected header format:
/// ```
/// Authorization: Bearer abc123xyz
/// ```
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // No configured key means no admin surface
    let expected_hash = state
        .admin_key_hash
        .as_deref()
        .ok_or(AppError::InvalidAdminKey)?;

    // Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidAdminKey)?;

    // Expected format: "Bearer <admin_key>"
    let presented = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidAdminKey)?;

    if hash_key(presented) != expected_hash {
        return Err(AppError::InvalidAdminKey);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_stable_and_hex_encoded() {
        let digest = hash_key("swordfish");
        assert_eq!(digest, hash_key("swordfish"));
        assert_ne!(digest, hash_key("Swordfish"));
        // SHA-256 digest is 32 bytes, 64 hex characters
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
