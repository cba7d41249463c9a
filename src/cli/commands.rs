//! CLI command implementations

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use dialoguer::{theme::ColorfulTheme, Input, Password};
use std::fs;
use std::sync::Arc;

use crate::api::{ApiClient, TokenBinding};
use crate::auth::{CredentialStore, SessionManager};
use crate::cli::{
    confirm, error, info, print_items_table, print_session, spinner, success, warn, OutputFormat,
};
use crate::config::{self, Config};
use crate::inventory::{InventoryService, ItemPatch, NewItem};

/// Everything a command needs, wired together in dependency order: the
/// token binding is shared between the client (reader) and the session
/// manager (sole writer), and the 401 hook points back at the manager.
struct App {
    config: Config,
    session: SessionManager,
    inventory: InventoryService,
}

async fn bootstrap() -> Result<App> {
    let config = config::load_config()?;

    let binding = TokenBinding::new();
    let client = Arc::new(ApiClient::new(&config.api, binding.clone())?);
    let store = CredentialStore::new(&config.storage);

    let session = SessionManager::new(&config, Arc::clone(&client), store, binding);
    session.install_unauthorized_hook();
    session.restore().await;

    let inventory = InventoryService::new(client, &config.api.inventory_items_path);

    Ok(App {
        config,
        session,
        inventory,
    })
}

/// Initialize a new stockroom.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new("stockroom.toml");

    if config_path.exists() {
        warn("stockroom.toml already exists");
        return Ok(());
    }

    let content = config::loader::default_config_content();
    fs::write(config_path, content)?;

    success("Created stockroom.toml");
    info("Point proxy_base at your deployed proxy, then run 'stockroom login admin'");

    Ok(())
}

/// Sign in through the admin endpoint
pub async fn login_admin(email: Option<String>) -> Result<()> {
    let app = bootstrap().await?;
    let theme = ColorfulTheme::default();

    let email = match email {
        Some(email) => email,
        None => Input::with_theme(&theme)
            .with_prompt("Admin email")
            .interact_text()?,
    };
    let password: String = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;

    let pb = spinner("Signing in...");
    let result = app.session.sign_in_admin(&email, &password).await;
    pb.finish_and_clear();

    match result {
        Ok(user) => {
            success(&format!("Signed in as {} (admin)", user.name));
            Ok(())
        }
        Err(e) => {
            error(&format!("Sign in failed: {}", e));
            Err(e.into())
        }
    }
}

/// Sign in through the customer endpoint
pub async fn login_customer(
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    let app = bootstrap().await?;
    let theme = ColorfulTheme::default();

    let name = match name {
        Some(name) => name,
        None => Input::with_theme(&theme)
            .with_prompt("Your name")
            .interact_text()?,
    };

    let pb = spinner("Signing in...");
    let result = app
        .session
        .sign_in_customer(&name, email.as_deref(), phone.as_deref())
        .await;
    pb.finish_and_clear();

    match result {
        Ok(user) => {
            success(&format!("Signed in as {} (customer)", user.name));
            Ok(())
        }
        Err(e) => {
            error(&format!("Sign in failed: {}", e));
            Err(e.into())
        }
    }
}

/// Sign out and clear the stored session
pub async fn logout() -> Result<()> {
    let app = bootstrap().await?;

    app.session.sign_out().await;
    success("Signed out");

    Ok(())
}

/// Show the current session
pub async fn whoami() -> Result<()> {
    let app = bootstrap().await?;

    print_session(&app.session.snapshot());

    Ok(())
}

/// List all inventory items
pub async fn items_list(format: OutputFormat) -> Result<()> {
    let app = bootstrap().await?;
    require_signed_in(&app)?;

    let pb = spinner("Fetching items...");
    let result = app.inventory.list().await;
    pb.finish_and_clear();

    match result {
        Ok(items) => {
            match format {
                OutputFormat::Table => {
                    let today = Utc::now().date_naive();
                    print_items_table(&items, &app.config.display, today);
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&items)?);
                }
            }
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to fetch items: {}", e));
            Err(e.into())
        }
    }
}

/// Add a new item
pub async fn items_add(
    name: String,
    qty: i64,
    price: f64,
    expires: Option<NaiveDate>,
    description: Option<String>,
) -> Result<()> {
    let app = bootstrap().await?;
    require_admin(&app)?;

    let new_item = NewItem {
        name,
        qty,
        price,
        expiry_date: expires,
        description,
    };

    let pb = spinner("Creating item...");
    let result = app.inventory.create(new_item).await;
    pb.finish_and_clear();

    match result {
        Ok(item) => {
            success(&format!("Created item '{}' ({})", item.name, item.id));
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to create item: {}", e));
            Err(e.into())
        }
    }
}

/// Update an existing item
#[allow(clippy::too_many_arguments)]
pub async fn items_update(
    id: String,
    name: Option<String>,
    qty: Option<i64>,
    price: Option<f64>,
    expires: Option<NaiveDate>,
    description: Option<String>,
) -> Result<()> {
    let app = bootstrap().await?;
    require_admin(&app)?;

    let patch = ItemPatch {
        name,
        qty,
        price,
        expiry_date: expires,
        description,
    };

    if patch.is_empty() {
        warn("Nothing to update - pass at least one of --name/--qty/--price/--expires/--description");
        return Ok(());
    }

    let pb = spinner("Updating item...");
    let result = app.inventory.update(&id, patch).await;
    pb.finish_and_clear();

    match result {
        Ok(()) => {
            success(&format!("Updated item {}", id));
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to update item: {}", e));
            Err(e.into())
        }
    }
}

/// Delete an item
pub async fn items_delete(id: String, force: bool) -> Result<()> {
    let app = bootstrap().await?;
    require_admin(&app)?;

    if !force && !confirm(&format!("Delete item {}?", id)) {
        info("Aborted");
        return Ok(());
    }

    let pb = spinner("Deleting item...");
    let result = app.inventory.delete(&id).await;
    pb.finish_and_clear();

    match result {
        Ok(()) => {
            success(&format!("Deleted item {}", id));
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to delete item: {}", e));
            Err(e.into())
        }
    }
}

fn require_signed_in(app: &App) -> Result<()> {
    if app.session.is_authenticated() {
        Ok(())
    } else {
        error("Not signed in. Run 'stockroom login admin' or 'stockroom login customer' first.");
        anyhow::bail!("not signed in")
    }
}

fn require_admin(app: &App) -> Result<()> {
    require_signed_in(app)?;
    if !app.session.is_admin() {
        // The backend enforces this too; failing early just gives a
        // clearer message than its 403.
        error("This operation needs an admin session.");
        anyhow::bail!("not an admin session")
    }
    Ok(())
}
