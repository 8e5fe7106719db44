//! Wearables CLI - drive the storefront cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the guest cart (persisted under STOREFRONT_DATA_DIR)
//! wearables show
//!
//! # Add, update and remove lines
//! wearables add 7 --name "Pulse Band" --price 1499 --quantity 2
//! wearables update 7 3
//! wearables remove 7
//!
//! # Sign in as user 42 first: the guest cart is merged into the server cart
//! wearables --user 42 --email shopper@example.com checkout
//!
//! # Resolve the backend session instead
//! wearables whoami
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart
//! - `add` / `update` / `remove` / `clear` - Change the cart
//! - `checkout` - Print the order summary
//! - `whoami` - Resolve the signed-in user from the backend
//! - `logout` - Sign out and reset to an empty guest cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wearables_core::{ProductId, UserId};
use wearables_storefront::Storefront;
use wearables_storefront::config::StorefrontConfig;
use wearables_storefront::session::User;

mod commands;

use commands::CliError;
use commands::cart::NewItem;

#[derive(Parser)]
#[command(name = "wearables")]
#[command(author, version, about = "Wearables storefront cart")]
struct Cli {
    /// Hand off this signed-in user before running the command
    #[arg(long, global = true, env = "WEARABLES_USER_ID")]
    user: Option<UserId>,

    /// Email of the signed-in user
    #[arg(long, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: ProductId,

        /// Product display name
        #[arg(short, long)]
        name: String,

        /// Unit price
        #[arg(short, long)]
        price: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,

        /// Product image URL
        #[arg(long, default_value = "")]
        image: String,
    },
    /// Set the quantity of a line (values below 1 become 1)
    Update {
        /// Product ID
        product_id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product_id: ProductId,
    },
    /// Empty the cart
    Clear,
    /// Print the order summary
    Checkout,
    /// Resolve the signed-in user from the backend
    Whoami,
    /// Sign out
    Logout,
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

    tracing::info!("Sentry initialized");
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
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Failed to load configuration: {e}");
            }
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wearables_storefront=info,wearables_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let storefront = Storefront::new(config)?;

    if let Some(id) = cli.user {
        let user = User {
            id,
            email: cli.email.unwrap_or_default(),
            name: None,
        };
        storefront.session().login_resolved(user).await?;
    }

    match cli.command {
        Commands::Show => commands::cart::show(&storefront),
        Commands::Add {
            product_id,
            name,
            price,
            quantity,
            image,
        } => {
            let item = NewItem {
                product_id,
                name,
                price,
                image,
                quantity,
            };
            commands::cart::add(&storefront, item).await?;
        }
        Commands::Update {
            product_id,
            quantity,
        } => commands::cart::update(&storefront, product_id, quantity).await?,
        Commands::Remove { product_id } => commands::cart::remove(&storefront, product_id).await?,
        Commands::Clear => commands::cart::clear(&storefront).await?,
        Commands::Checkout => commands::cart::checkout(&storefront)?,
        Commands::Whoami => commands::session::whoami(&storefront).await?,
        Commands::Logout => commands::session::logout(&storefront).await,
    }
    Ok(())
}
