//! CLI interface for stockroom

pub mod commands;
mod output;

pub use output::*;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(version = "0.4.1")]
#[command(about = "Inventory client for webhook backends behind a CORS proxy", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new stockroom.toml configuration file
    Init,

    /// Sign in and persist the session
    Login {
        #[command(subcommand)]
        role: LoginRole,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the current session
    Whoami,

    /// Inventory operations
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
}

#[derive(Subcommand)]
pub enum LoginRole {
    /// Sign in through the admin endpoint
    Admin {
        /// Admin email (prompted for when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Sign in through the customer endpoint
    Customer {
        /// Customer name (prompted for when omitted)
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ItemsAction {
    /// List all inventory items
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Add a new item
    Add {
        /// Item name
        name: String,

        /// Quantity in stock
        #[arg(short, long)]
        qty: i64,

        /// Unit price
        #[arg(short, long)]
        price: f64,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<NaiveDate>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Update an existing item
    Update {
        /// Item id
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        qty: Option<i64>,

        #[arg(short, long)]
        price: Option<f64>,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<NaiveDate>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete an item
    Delete {
        /// Item id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
