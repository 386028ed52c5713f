//! Request-level middleware.
//!
//! Only authentication lives here; transport concerns (timeouts, body
//! limits, tracing layers) belong to the embedding service.

pub mod auth;
