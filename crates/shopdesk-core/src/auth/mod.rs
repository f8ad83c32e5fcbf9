//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `TokenStore`: persistence of the single session token (file, OS keychain,
//!   or in-memory)
//! - `token`: structural validity check of a token (segments, payload, expiry)
//! - `SessionContext`: login/logout and the guard run before each view
//!
//! The validity check is advisory. Real authorization happens server-side on
//! every API call.

pub mod session;
pub mod store;
pub mod token;

pub use session::{GuardDecision, LoginOutcome, SessionContext, SessionState, View};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, StoreBackend, TokenStore};
pub use token::{is_valid, is_valid_at, validate_at, TokenClaims, TokenError};
