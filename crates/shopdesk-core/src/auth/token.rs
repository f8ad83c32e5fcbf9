//! Structural validity check for session tokens.
//!
//! A well-formed token has exactly three dot-separated segments. The middle
//! one decodes from base64 to a JSON object, and if that object carries a
//! numeric `exp` (epoch seconds) the token is expired once now passes it.
//!
//! This never verifies a signature. The client cannot authoritatively check a
//! token, it can only reject obviously broken or expired ones.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of segments in a well-formed token (header.payload.signature)
const TOKEN_SEGMENTS: usize = 3;

/// Accept padded or unpadded input and ignore trailing bits, like a
/// forgiving browser decoder does.
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is empty")]
    Empty,

    #[error("Expected {TOKEN_SEGMENTS} segments, found {0}")]
    Segments(usize),

    #[error("Payload segment is not valid base64")]
    Base64,

    #[error("Payload is not valid JSON: {0}")]
    Json(String),

    #[error("Payload is not a JSON object")]
    NotObject,

    #[error("Token expired")]
    Expired,
}

/// Decoded payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// Expiry in epoch seconds, when the payload carries a numeric `exp`
    pub exp: Option<f64>,
    pub payload: Map<String, Value>,
}

impl TokenClaims {
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != TOKEN_SEGMENTS {
            return Err(TokenError::Segments(segments.len()));
        }

        let bytes = decode_segment(segments[1]).ok_or(TokenError::Base64)?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| TokenError::Json(e.to_string()))?;

        match value {
            Value::Object(payload) => {
                let exp = payload.get("exp").and_then(Value::as_f64);
                Ok(Self { exp, payload })
            }
            _ => Err(TokenError::NotObject),
        }
    }

    /// Expired when `exp` is strictly before `now_secs`
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        matches!(self.exp, Some(exp) if exp < now_secs as f64)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp
            .and_then(|exp| DateTime::from_timestamp(exp.trunc() as i64, 0))
    }

    /// Subject claim, if present and a string
    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(Value::as_str)
    }
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    STANDARD_LENIENT
        .decode(segment)
        .or_else(|_| URL_SAFE_LENIENT.decode(segment))
        .ok()
}

/// Check a token against the current system time
pub fn is_valid(token: &str) -> bool {
    is_valid_at(token, Utc::now().timestamp())
}

pub fn is_valid_at(token: &str, now_secs: i64) -> bool {
    validate_at(token, now_secs).is_ok()
}

/// Like `is_valid_at`, but says why a token is rejected
pub fn validate_at(token: &str, now_secs: i64) -> Result<TokenClaims, TokenError> {
    let claims = TokenClaims::decode(token)?;
    if claims.is_expired_at(now_secs) {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}
