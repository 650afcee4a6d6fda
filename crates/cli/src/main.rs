//! Duodude CLI - browse the catalog, manage the cart, and place orders.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! duodude products list --sort createdAt --limit 8
//! duodude products show 64f1c0ffee
//!
//! # Cart (guest until you log in)
//! duodude cart add 64f1c0ffee --quantity 2 --size M
//! duodude cart show
//!
//! # Sign in; the guest cart moves into your account cart
//! duodude login --token "$TOKEN"
//!
//! # Check out
//! duodude orders place --name "Asha" --street "12 MG Road" --city Pune --zip 411001 --country India
//!
//! # Account
//! duodude account update --name "Asha K"
//! duodude account add-address --kind work --street "4 Baner Rd" --city Pune --zip 411045 --country India
//! ```
//!
//! # Environment Variables
//!
//! See `duodude_storefront::config` (`DUODUDE_API_BASE_URL` is required).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use duodude_storefront::config::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;

use commands::{AccountAction, CartAction, OrdersAction, ProductsAction, SlidesAction};
use context::Context;

#[derive(Parser)]
#[command(name = "duodude")]
#[command(author, version, about = "Duodude storefront CLI")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign in with a token issued by the backend
    Login {
        /// Bearer token
        #[arg(short, long, env = "DUODUDE_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Sign out; the account cart stays on the server
    Logout,
    /// Show who is signed in
    Whoami,
    /// Edit the profile and saved addresses
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// List, place, cancel, and return orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Manage home page hero slides (admin only)
    Slides {
        #[command(subcommand)]
        action: SlidesAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with(&format!("Failed to load configuration: {e}")),
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr; stdout carries command output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "duodude_storefront=info,duodude=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::new(config).await?;
    let json = cli.json;

    match cli.command {
        Commands::Products { action } => commands::products::run(&ctx, action, json).await?,
        Commands::Cart { action } => commands::cart::run(&ctx, action, json).await?,
        Commands::Login { token } => commands::account::login(&ctx, token).await?,
        Commands::Logout => commands::account::logout(&ctx).await?,
        Commands::Whoami => commands::account::whoami(&ctx, json)?,
        Commands::Account { action } => commands::account::run(&ctx, action, json).await?,
        Commands::Orders { action } => commands::orders::run(&ctx, action, json).await?,
        Commands::Slides { action } => commands::slides::run(&ctx, action, json).await?,
    }
    Ok(())
}

#[allow(clippy::print_stderr)]
fn exit_with(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}
