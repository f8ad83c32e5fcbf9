use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::LoginRequest;

use super::store::TokenStore;
use super::token::{self, TokenError};

/// Views of the admin frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Orders,
    Products,
    Users,
    About,
    Login,
    Register,
}

impl View {
    /// Login and registration are reachable without a session
    pub fn is_auth_view(&self) -> bool {
        matches!(self, View::Login | View::Register)
    }

    pub fn path(&self) -> &'static str {
        match self {
            View::Home => "/",
            View::Orders => "/pedidos",
            View::Products => "/produtos",
            View::Users => "/usuarios",
            View::About => "/sobre",
            View::Login => "/login",
            View::Register => "/cadastro",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Orders => "Orders",
            View::Products => "Products",
            View::Users => "Users",
            View::About => "About",
            View::Login => "Login",
            View::Register => "Register",
        }
    }
}

/// Outcome of the guard check for a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(View),
}

/// Result of a login the server accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    /// The token was saved but fails the validity check, so protected views
    /// will still redirect to login
    UnusableToken(TokenError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(String),
}

/// Session context handed to views and the API client.
/// Clone is cheap, all clones share one store.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn TokenStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    /// Raw stored token, valid or not
    pub fn token(&self) -> Option<String> {
        self.store.get()
    }

    pub fn current(&self) -> SessionState {
        match self.store.get() {
            Some(t) if token::is_valid(&t) => SessionState::Authenticated(t),
            _ => SessionState::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.current(), SessionState::Authenticated(_))
    }

    /// Log in through the API and persist the issued token
    pub async fn login(&self, api: &ApiClient, request: &LoginRequest) -> Result<LoginOutcome> {
        let response = api.login(request).await?;
        self.store
            .set(&response.token)
            .context("Failed to save session token")?;

        match token::validate_at(&response.token, Utc::now().timestamp()) {
            Ok(_) => {
                info!(login = %request.login, "Session started");
                Ok(LoginOutcome::Authenticated)
            }
            Err(e) => {
                warn!(login = %request.login, error = %e, "Server issued an unusable token");
                Ok(LoginOutcome::UnusableToken(e))
            }
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("Session ended");
        Ok(())
    }

    /// Decide whether `view` may render.
    ///
    /// Protected views need a present, structurally valid token; otherwise
    /// the store is cleared and the user is sent to login. Auth views invert
    /// the check and send an already-authenticated user home.
    pub fn guard(&self, view: View) -> GuardDecision {
        let valid = self
            .store
            .get()
            .map(|t| token::is_valid(&t))
            .unwrap_or(false);

        if view.is_auth_view() {
            return if valid {
                debug!(view = view.path(), "Already authenticated, redirecting home");
                GuardDecision::Redirect(View::Home)
            } else {
                GuardDecision::Render
            };
        }

        if valid {
            return GuardDecision::Render;
        }

        debug!(view = view.path(), "No valid session, redirecting to login");
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear invalid token");
        }
        GuardDecision::Redirect(View::Login)
    }

    /// React to a failed API call. An unauthorized response ends the session
    /// and sends the user to login; anything else stays an inline error.
    pub fn handle_error(&self, err: &anyhow::Error) -> Option<GuardDecision> {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Unauthorized) => {
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear rejected token");
                }
                Some(GuardDecision::Redirect(View::Login))
            }
            _ => None,
        }
    }
}
