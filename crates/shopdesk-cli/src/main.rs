//! shopdesk - a terminal admin for the store API.
//!
//! Each subcommand is a view: protected views pass the session guard before
//! they talk to the API, login and registration are only offered while
//! logged out.

mod app;
mod views;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shopdesk_core::Config;

use app::App;

/// Log file name inside the cache directory
const LOG_FILE: &str = "shopdesk.log";

#[derive(Debug, Parser)]
#[command(name = "shopdesk", version, about = "Admin for the store API: products, orders and users")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and save the session token
    Login {
        #[arg(long, env = "SHOPDESK_LOGIN")]
        login: Option<String>,
    },
    /// Clear the saved session
    Logout,
    /// Create an account
    Register {
        #[arg(long)]
        login: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show the saved session and where it points
    Status,
    Home,
    #[command(subcommand)]
    Products(ProductAction),
    #[command(subcommand)]
    Orders(OrderAction),
    #[command(subcommand)]
    Users(UserAction),
    About,
}

#[derive(Debug, Subcommand)]
pub enum ProductAction {
    List {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    Create(ProductFields),
    /// Change the given fields, keeping the rest
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
    },
    Delete { id: i64 },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ProductFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<f64>,
    #[arg(long)]
    pub available: Option<bool>,
}

#[derive(Debug, Subcommand)]
pub enum OrderAction {
    List {
        #[arg(long)]
        json: bool,
    },
    Create(OrderFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: OrderFields,
    },
    Delete { id: i64 },
}

#[derive(Debug, Clone, Default, Args)]
pub struct OrderFields {
    #[arg(long)]
    pub customer_name: Option<String>,
    #[arg(long)]
    pub customer_email: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    /// Product id, repeat for several products
    #[arg(long = "product")]
    pub product_ids: Vec<i64>,
}

#[derive(Debug, Subcommand)]
pub enum UserAction {
    List {
        #[arg(long)]
        json: bool,
    },
}

/// Initialize the tracing subscriber, writing to a file so stdout stays
/// reserved for view output. Use RUST_LOG to control the level.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_dir = Config::default().cache_dir().ok();
    let _log_guard = init_tracing(log_dir.as_deref());

    let mut app = App::new()?;
    info!(command = ?cli.command, "shopdesk starting");

    let code = app.run(cli.command).await;
    Ok(code)
}
