//! Data models for the store API.
//!
//! Each endpoint exchanges an explicit typed record. Inputs are validated
//! before they leave the client:
//!
//! - `Product`, `ProductInput`: catalog items
//! - `Order`, `OrderInput`, `OrderProduct`: customer orders
//! - `User`, `RegisterRequest`: accounts
//! - `LoginRequest`, `LoginResponse`: session issuance

pub mod auth;
pub mod order;
pub mod product;
pub mod user;

pub use auth::{LoginRequest, LoginResponse};
pub use order::{Order, OrderInput, OrderProduct, DEFAULT_ORDER_STATUS};
pub use product::{Product, ProductInput};
pub use user::{RegisterRequest, User};

use thiserror::Error;

/// A request record rejected before it was sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub(crate) fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "must not be empty"))
    } else {
        Ok(())
    }
}
