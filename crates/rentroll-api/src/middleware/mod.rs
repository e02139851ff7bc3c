//! HTTP middleware for bearer-token authentication and role checks.
pub mod auth;
