//! CLI output formatting utilities

use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::auth::SessionState;
use crate::config::DisplayConfig;
use crate::inventory::Item;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Ask for a yes/no confirmation
pub fn confirm(message: &str) -> bool {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Spinner shown while a network call is in flight
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("Invalid spinner template - this is a bug in the codebase"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a table of inventory items
pub fn print_items_table(items: &[Item], display: &DisplayConfig, today: NaiveDate) {
    if items.is_empty() {
        info("No items found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Qty").fg(Color::Cyan),
            Cell::new("Price").fg(Color::Cyan),
            Cell::new("Expires").fg(Color::Cyan),
            Cell::new("Description").fg(Color::Cyan),
        ]);

    for item in items {
        let qty_cell = if item.is_low_stock(display.low_stock_threshold) {
            Cell::new(format!("{} (low)", item.qty)).fg(Color::Yellow)
        } else {
            Cell::new(item.qty)
        };

        let expires_cell = match item.expiry_date {
            Some(date) if item.is_expired(today) => {
                Cell::new(format!("{} (expired)", date)).fg(Color::Red)
            }
            Some(date) => Cell::new(date.to_string()),
            None => Cell::new("-"),
        };

        table.add_row(vec![
            Cell::new(&item.id),
            Cell::new(&item.name),
            qty_cell,
            Cell::new(format!("{}{:.2}", display.currency, item.price)),
            expires_cell,
            Cell::new(item.description.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");

    let low = items
        .iter()
        .filter(|i| i.is_low_stock(display.low_stock_threshold))
        .count();
    if low > 0 {
        warn(&format!("{} item(s) at or below the low-stock threshold", low));
    }
}

/// Print the current session details
pub fn print_session(state: &SessionState) {
    if state.is_loading {
        info("Session is still being restored.");
        return;
    }

    match &state.user {
        Some(user) => {
            println!("{}", console::style("Current session").bold().underlined());
            println!();
            println!("  {} {}", "Name:".bold(), user.name);
            println!("  {} {}", "Role:".bold(), format_role(&user.role.to_string()));
            println!("  {} {}", "ID:".bold(), user.id);
            if let Some(email) = &user.email {
                println!("  {} {}", "Email:".bold(), email);
            }
            if let Some(phone) = &user.phone {
                println!("  {} {}", "Phone:".bold(), phone);
            }
        }
        None => {
            info("Not signed in. Run 'stockroom login admin' or 'stockroom login customer'.");
        }
    }
}

/// Format a role tag as a colored string
pub fn format_role(role: &str) -> String {
    match role {
        "admin" => role.magenta().to_string(),
        "customer" => role.green().to_string(),
        _ => role.to_string(),
    }
}
