//! Exprz CLI - database migrations and shop management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply the API's SQL migrations
//! exprz-cli migrate
//!
//! # Grant or revoke admin rights
//! exprz-cli admin promote --email owner@exprz.shop
//! exprz-cli admin demote --email former@exprz.shop
//!
//! # Load categories and products from YAML
//! exprz-cli seed catalog --file catalog.yaml
//!
//! # Retry failed order emails once
//! exprz-cli notifications retry
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "exprz-cli")]
#[command(author, version, about = "Exprz Ecommerce CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin rights
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Order notification maintenance
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing user admin rights
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Remove admin rights from a user
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert categories and insert products from a YAML file
    Catalog {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[derive(Subcommand)]
enum NotificationAction {
    /// Run one retry sweep for failed order emails
    Retry,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::set_admin(&email, true).await?,
            AdminAction::Demote { email } => commands::admin::set_admin(&email, false).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
        Commands::Notifications { action } => match action {
            NotificationAction::Retry => commands::notifications::retry().await?,
        },
    }
    Ok(())
}
