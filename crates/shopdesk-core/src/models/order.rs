use serde::{Deserialize, Serialize};

use super::{require_non_blank, ValidationError};

/// Status given to new orders when none is chosen
pub const DEFAULT_ORDER_STATUS: &str = "pending";

/// Product line as embedded in an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct OrderProduct {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Order {
    pub id: i64,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerEmail")]
    pub customer_email: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(rename = "totalAmount", default)]
    pub total_amount: f64,
    #[serde(default)]
    pub products: Vec<OrderProduct>,
}

fn default_status() -> String {
    DEFAULT_ORDER_STATUS.to_string()
}

impl Order {
    pub fn total_display(&self) -> String {
        format!("R$ {:.2}", self.total_amount)
    }

    /// Comma-separated product names
    pub fn products_display(&self) -> String {
        self.products
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_input(&self) -> OrderInput {
        OrderInput {
            customer_name: self.customer_name.clone(),
            customer_email: self.customer_email.clone(),
            status: self.status.clone(),
            product_ids: self.products.iter().map(|p| p.id).collect(),
        }
    }
}

/// Body for creating or updating an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderInput {
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerEmail")]
    pub customer_email: String,
    pub status: String,
    #[serde(rename = "productIds")]
    pub product_ids: Vec<i64>,
}

impl Default for OrderInput {
    fn default() -> Self {
        Self {
            customer_name: String::new(),
            customer_email: String::new(),
            status: default_status(),
            product_ids: Vec::new(),
        }
    }
}

impl OrderInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("customerName", &self.customer_name)?;
        if !looks_like_email(&self.customer_email) {
            return Err(ValidationError::new(
                "customerEmail",
                "must be an email address",
            ));
        }
        require_non_blank("status", &self.status)
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
