//! Router Module Index
//!
//! Splits the endpoints by access level. Admin handlers take an
//! `AdminAccess` argument, which rejects a missing or wrong token with 401.

/// Routes open to any client: form submission and liveness.
pub mod public;

/// Routes gated by the admin secret.
pub mod admin;
