use serde::{Deserialize, Serialize};

use super::{require_non_blank, ValidationError};

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default = "default_available")]
    pub available: bool,
}

impl Product {
    pub fn price_display(&self) -> String {
        format!("R$ {:.2}", self.price)
    }

    pub fn available_display(&self) -> &'static str {
        if self.available {
            "Yes"
        } else {
            "No"
        }
    }

    /// Prefill an edit form from an existing product
    pub fn to_input(&self) -> ProductInput {
        ProductInput {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            available: self.available,
        }
    }
}

/// Body for creating or updating a product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub available: bool,
}

impl Default for ProductInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            price: 0.0,
            available: true,
        }
    }
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::new(
                "price",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}
