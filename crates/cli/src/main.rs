//! Pagermart CLI - storefront and operator console over the shop API.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! pagermart catalog
//! pagermart catalog --search sentinel
//!
//! # Create a customer account (password from PAGERMART_PASSWORD or prompt)
//! pagermart register --username nora --email nora@example.com
//!
//! # Interactive shopping session
//! pagermart shop
//!
//! # Operator console
//! pagermart ops units --username opal --status active
//! pagermart ops activate --username opal b4c51b4e-9a5e-4f6e-bb1a-0d8c2f9d2e61
//! ```
//!
//! The API endpoint comes from `PAGERMART_API_BASE_URL` (see `.env.example`).

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use pagermart_client::Shop;
use pagermart_client::config::ClientConfig;
use pagermart_core::{UnitId, UnitStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "pagermart")]
#[command(author, version, about = "Pagermart storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog items
    Catalog {
        /// Case-insensitive name/description filter
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Create a customer account
    Register {
        /// Username for the new account
        #[arg(short, long)]
        username: String,

        /// Email address for the new account
        #[arg(short, long)]
        email: String,
    },
    /// Interactive customer shopping session
    Shop,
    /// Operator console
    Ops {
        #[command(subcommand)]
        action: OpsAction,
    },
}

#[derive(Subcommand)]
enum OpsAction {
    /// List sold units
    Units {
        /// Operator username
        #[arg(short, long)]
        username: String,

        /// Filter by status (`active`, `activated`)
        #[arg(short, long)]
        status: Option<UnitStatus>,
    },
    /// Activate sold units
    Activate {
        /// Operator username
        #[arg(short, long)]
        username: String,

        /// Unit ids to activate
        #[arg(required = true)]
        unit_ids: Vec<UnitId>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Default to quiet client logs so output stays readable; RUST_LOG
    // overrides.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pagermart_cli=info,pagermart_client=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let shop = Shop::new(&config)?;

    match cli.command {
        Commands::Catalog { search } => {
            commands::catalog::run(&shop, search.as_deref()).await;
        }
        Commands::Register { username, email } => {
            commands::register::run(&shop, &username, &email).await?;
        }
        Commands::Shop => commands::shop::run(&shop).await?,
        Commands::Ops { action } => match action {
            OpsAction::Units { username, status } => {
                commands::ops::units(&shop, &username, status).await?;
            }
            OpsAction::Activate { username, unit_ids } => {
                commands::ops::activate(&shop, &username, &unit_ids).await?;
            }
        },
    }
    Ok(())
}
