//! Hire Purchase CLI - migrations, tenant bootstrap and maintenance jobs.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! hp-cli migrate
//!
//! # Create a business and its first business admin
//! hp-cli business create --name "Acme Furniture" --slug acme --currency KES \
//!     --admin-email owner@acme.test --admin-name "Grace Wanjiru" --admin-password '...'
//!
//! # Load a demo business with a shop, staff, customers and a purchase
//! hp-cli seed demo
//!
//! # Move purchases whose installments fell due to overdue (cron job)
//! hp-cli purchases refresh-overdue
//! ```
//!
//! All commands read `DATABASE_URL` from the environment or `.env`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hp-cli")]
#[command(author, version, about = "Hire Purchase CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage businesses (tenants)
    Business {
        #[command(subcommand)]
        action: BusinessAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Purchase maintenance jobs
    Purchases {
        #[command(subcommand)]
        action: PurchaseAction,
    },
}

#[derive(Subcommand)]
enum BusinessAction {
    /// Create a business with its first business admin
    Create {
        /// Display name
        #[arg(long)]
        name: String,

        /// Unique URL-safe identifier
        #[arg(long)]
        slug: String,

        /// ISO 4217 currency code
        #[arg(long, default_value = "KES")]
        currency: String,

        #[arg(long)]
        admin_email: String,

        #[arg(long)]
        admin_name: String,

        /// Ignored when the email is already registered
        #[arg(long, env = "HP_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Demo business with one shop, staff, products, customers and a purchase
    Demo {
        /// Password of every demo user
        #[arg(long, default_value = "demo-password")]
        password: String,
    },
}

#[derive(Subcommand)]
enum PurchaseAction {
    /// Refresh pending/active/overdue statuses as of a date (default: today, UTC)
    RefreshOverdue {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hp_cli=info,hire_purchase_server=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Business { action } => match action {
            BusinessAction::Create {
                name,
                slug,
                currency,
                admin_email,
                admin_name,
                admin_password,
            } => {
                commands::business::create(&commands::business::NewBusiness {
                    name,
                    slug,
                    currency,
                    admin_email,
                    admin_name,
                    admin_password,
                })
                .await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Demo { password } => commands::seed::demo(&password).await?,
        },
        Commands::Purchases { action } => match action {
            PurchaseAction::RefreshOverdue { date } => {
                commands::purchases::refresh_overdue(date).await?;
            }
        },
    }
    Ok(())
}
