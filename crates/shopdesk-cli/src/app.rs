//! Application state and view dispatch for shopdesk.
//!
//! `App` owns the configuration, the session context and the API client. The
//! session and the client share one token store, so a login, logout or a
//! rejected credential is seen by both.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use futures::future;
use tracing::{debug, error, warn};

use shopdesk_core::auth::token::TokenClaims;
use shopdesk_core::models::{LoginRequest, OrderInput, ProductInput, RegisterRequest};
use shopdesk_core::{
    ApiClient, ApiError, Config, GuardDecision, LoginOutcome, SessionContext, View,
};

use crate::views;
use crate::{Command, OrderAction, OrderFields, ProductAction, ProductFields, UserAction};

/// Environment variable holding the password for non-interactive login
const PASSWORD_ENV: &str = "SHOPDESK_PASSWORD";

/// Exit code when the user must log in (or is already logged in)
const EXIT_REDIRECT: u8 = 2;

pub struct App {
    config: Config,
    session: SessionContext,
    api: ApiClient,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config
            .cache_dir()
            .unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, backend = ?config.token_store, "Opening token store");
        let store = config.token_store.open(cache_dir);

        let api = ApiClient::new(&config.api_url(), store.clone())?;
        let session = SessionContext::new(store);

        Ok(Self {
            config,
            session,
            api,
        })
    }

    pub async fn run(&mut self, command: Command) -> ExitCode {
        let view = view_for(&command);
        let label = label_for(&command);
        if is_guarded(&command) {
            if let GuardDecision::Redirect(target) = self.session.guard(view) {
                return redirect(target);
            }
        }

        let result = match command {
            Command::Login { login } => self.login(login).await,
            Command::Logout => self.logout(),
            Command::Register { login, name, email } => self.register(login, name, email).await,
            Command::Status => {
                self.status();
                Ok(())
            }
            Command::Home => {
                println!("{}", views::home());
                Ok(())
            }
            Command::About => {
                println!("{}", views::about());
                Ok(())
            }
            Command::Products(action) => self.products(action).await,
            Command::Orders(action) => self.orders(action).await,
            Command::Users(UserAction::List { json }) => self.users(json).await,
        };

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => self.report(view, label, e),
        }
    }

    /// Turn a failed view into either a login redirect or an inline message
    fn report(&self, view: View, label: &str, err: anyhow::Error) -> ExitCode {
        // A rejected login is a wrong password, not an expired session
        if !view.is_auth_view() {
            if let Some(GuardDecision::Redirect(target)) = self.session.handle_error(&err) {
                return redirect(target);
            }
        }
        error!(view = view.path(), command = label, error = %err, "View failed");
        eprintln!("{}", user_message(view, label, &err));
        ExitCode::FAILURE
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login(&mut self, login: Option<String>) -> Result<()> {
        let login = match login.or_else(|| self.config.last_login.clone()) {
            Some(login) => login,
            None => prompt_line("Login: ")?,
        };
        let password = read_password()?;

        let outcome = self
            .session
            .login(&self.api, &LoginRequest::new(login.clone(), password))
            .await?;

        self.config.last_login = Some(login);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        match outcome {
            LoginOutcome::Authenticated => {
                println!("Login successful.");
                Ok(())
            }
            LoginOutcome::UnusableToken(e) => {
                anyhow::bail!("the server accepted the login but issued an unusable token ({})", e)
            }
        }
    }

    fn logout(&self) -> Result<()> {
        self.session.logout()?;
        println!("Logged out.");
        Ok(())
    }

    async fn register(
        &self,
        login: String,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<()> {
        let password = read_password()?;
        let request = RegisterRequest {
            login,
            password,
            name,
            email,
        };
        self.api.register(&request).await?;
        println!("Account created. You can now run `shopdesk login`.");
        Ok(())
    }

    fn status(&self) {
        println!("API:     {}", self.api.base_url());
        println!("Store:   {:?}", self.config.token_store);
        match self.session.token() {
            None => println!("Session: none"),
            Some(token) => match TokenClaims::decode(&token) {
                Ok(claims) => {
                    let state = if self.session.is_authenticated() {
                        "valid"
                    } else {
                        "expired"
                    };
                    println!("Session: {}", state);
                    if let Some(sub) = claims.subject() {
                        println!("Subject: {}", sub);
                    }
                    match claims.expires_at() {
                        Some(at) => println!("Expires: {}", at.to_rfc3339()),
                        None => println!("Expires: never"),
                    }
                }
                Err(e) => println!("Session: malformed ({})", e),
            },
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn products(&self, action: ProductAction) -> Result<()> {
        match action {
            ProductAction::List { json } => {
                let products = self.api.list_products().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&products)?);
                } else {
                    println!("{}", views::products_table(&products));
                }
            }
            ProductAction::Create(fields) => {
                let input = apply_product_fields(ProductInput::default(), fields);
                match self.api.create_product(&input).await? {
                    Some(product) => println!("Created product {}.", product.id),
                    None => println!("Product created."),
                }
            }
            ProductAction::Update { id, fields } => {
                let current = self
                    .api
                    .list_products()
                    .await?
                    .into_iter()
                    .find(|p| p.id == id)
                    .ok_or_else(|| ApiError::NotFound(format!("product {}", id)))?;
                let input = apply_product_fields(current.to_input(), fields);
                self.api.update_product(id, &input).await?;
                println!("Updated product {}.", id);
            }
            ProductAction::Delete { id } => {
                self.api.delete_product(id).await?;
                println!("Deleted product {}.", id);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn orders(&self, action: OrderAction) -> Result<()> {
        match action {
            OrderAction::List { json } => {
                let (orders, products) =
                    future::try_join(self.api.list_orders(), self.api.list_products()).await?;
                debug!(orders = orders.len(), products = products.len(), "Orders view loaded");
                if json {
                    println!("{}", serde_json::to_string_pretty(&orders)?);
                } else {
                    println!("{}", views::orders_table(&orders));
                    println!();
                    println!("{}", views::product_picker(&products));
                }
            }
            OrderAction::Create(fields) => {
                let input = apply_order_fields(OrderInput::default(), fields);
                match self.api.create_order(&input).await? {
                    Some(order) => println!("Created order {}.", order.id),
                    None => println!("Order created."),
                }
            }
            OrderAction::Update { id, fields } => {
                let current = self
                    .api
                    .list_orders()
                    .await?
                    .into_iter()
                    .find(|o| o.id == id)
                    .ok_or_else(|| ApiError::NotFound(format!("order {}", id)))?;
                let input = apply_order_fields(current.to_input(), fields);
                self.api.update_order(id, &input).await?;
                println!("Updated order {}.", id);
            }
            OrderAction::Delete { id } => {
                self.api.delete_order(id).await?;
                println!("Deleted order {}.", id);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn users(&self, json: bool) -> Result<()> {
        let users = self.api.list_users().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&users)?);
        } else {
            println!("{}", views::users_table(&users));
        }
        Ok(())
    }
}

/// The view a command activates
fn view_for(command: &Command) -> View {
    match command {
        Command::Login { .. } => View::Login,
        Command::Logout | Command::Status | Command::Home => View::Home,
        Command::Register { .. } => View::Register,
        Command::Products(_) => View::Products,
        Command::Orders(_) => View::Orders,
        Command::Users(_) => View::Users,
        Command::About => View::About,
    }
}

/// Name used when reporting a failed command
fn label_for(command: &Command) -> &'static str {
    match command {
        Command::Logout => "Logout",
        Command::Status => "Status",
        other => view_for(other).title(),
    }
}

/// Logout and status work whatever the session state
fn is_guarded(command: &Command) -> bool {
    !matches!(command, Command::Logout | Command::Status)
}

fn redirect(target: View) -> ExitCode {
    match target {
        View::Login => eprintln!("Not logged in or session expired. Run `shopdesk login`."),
        View::Home => eprintln!("Already logged in. Run `shopdesk logout` first to switch accounts."),
        other => eprintln!("Continue at `{}`.", other.path()),
    }
    ExitCode::from(EXIT_REDIRECT)
}

fn apply_product_fields(mut input: ProductInput, fields: ProductFields) -> ProductInput {
    if let Some(name) = fields.name {
        input.name = name;
    }
    if let Some(description) = fields.description {
        input.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(price) = fields.price {
        input.price = price;
    }
    if let Some(available) = fields.available {
        input.available = available;
    }
    input
}

fn apply_order_fields(mut input: OrderInput, fields: OrderFields) -> OrderInput {
    if let Some(name) = fields.customer_name {
        input.customer_name = name;
    }
    if let Some(email) = fields.customer_email {
        input.customer_email = email;
    }
    if let Some(status) = fields.status {
        input.status = status;
    }
    if !fields.product_ids.is_empty() {
        input.product_ids = fields.product_ids;
    }
    input
}

/// User-facing text for a failed view
fn user_message(view: View, label: &str, err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthorized) if view == View::Login => {
            "Invalid login or password".to_string()
        }
        Some(ApiError::NetworkError(e)) if e.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        Some(ApiError::NetworkError(e)) if e.is_connect() => {
            "Unable to connect to server. Check the API URL and your connection.".to_string()
        }
        Some(ApiError::Validation(e)) => format!("Invalid input - {}", e),
        Some(api_err) => format!("{} failed: {}", label, api_err),
        None => format!("{} failed: {:#}", label, err),
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    use std::io::{self, Write};

    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}
