//! REST API client module for the store backend.
//!
//! This module provides the `ApiClient` for the products, orders and users
//! endpoints, plus login and registration.
//!
//! Every request reads the current token from the injected `TokenStore` and
//! carries it as a bearer credential when one is present.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_API_URL};
pub use error::ApiError;
