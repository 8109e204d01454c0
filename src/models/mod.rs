//! Data models representing database entities and API payloads.
//!
//! This module contains all data structures that map to database tables
//! or cross the HTTP boundary.

/// License code pool model
pub mod license;
/// Payment processor types
pub mod payment;
