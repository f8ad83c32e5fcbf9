use serde::{Deserialize, Serialize};

use super::{require_non_blank, ValidationError};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("login", &self.login)?;
        require_non_blank("password", &self.password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

impl LoginResponse {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("token", &self.token)
    }
}
