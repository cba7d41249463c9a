use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod cli;
mod config;
mod error;
mod inventory;

use cli::{Cli, Commands, ItemsAction, LoginRole};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockroom=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Login { role } => match role {
            LoginRole::Admin { email } => cli::commands::login_admin(email).await,
            LoginRole::Customer { name, email, phone } => {
                cli::commands::login_customer(name, email, phone).await
            }
        },
        Commands::Logout => cli::commands::logout().await,
        Commands::Whoami => cli::commands::whoami().await,
        Commands::Items { action } => match action {
            ItemsAction::List { format } => cli::commands::items_list(format).await,
            ItemsAction::Add {
                name,
                qty,
                price,
                expires,
                description,
            } => cli::commands::items_add(name, qty, price, expires, description).await,
            ItemsAction::Update {
                id,
                name,
                qty,
                price,
                expires,
                description,
            } => cli::commands::items_update(id, name, qty, price, expires, description).await,
            ItemsAction::Delete { id, force } => cli::commands::items_delete(id, force).await,
        },
    }
}
