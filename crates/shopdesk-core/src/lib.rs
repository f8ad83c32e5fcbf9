//! Core library for shopdesk.
//!
//! Provides the pieces a store admin frontend needs to talk to the REST API:
//!
//! - [`auth`]: session token store, structural token validity check, and the
//!   session guard that decides whether a view may render
//! - [`api`]: the HTTP client that attaches the bearer credential to every
//!   request, plus its error taxonomy
//! - [`models`]: typed request/response records for each endpoint
//! - [`config`]: persisted application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{GuardDecision, LoginOutcome, SessionContext, SessionState, TokenStore, View};
pub use config::Config;
