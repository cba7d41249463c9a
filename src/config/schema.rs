//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Backend endpoints, reached through the CORS proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the deployed proxy (no trailing slash). The webhook path
    /// is passed as a `?path=` query parameter.
    #[serde(default = "default_proxy_base")]
    pub proxy_base: String,

    #[serde(default = "default_admin_login_path")]
    pub admin_login_path: String,

    #[serde(default = "default_customer_login_path")]
    pub customer_login_path: String,

    #[serde(default = "default_inventory_items_path")]
    pub inventory_items_path: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_proxy_base() -> String {
    "https://proxy-inventory.netlify.app/.netlify/functions/proxy".to_string()
}

fn default_admin_login_path() -> String {
    "auth/admin/login".to_string()
}

fn default_customer_login_path() -> String {
    "auth/customer/login".to_string()
}

fn default_inventory_items_path() -> String {
    "inventory/items".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            proxy_base: default_proxy_base(),
            admin_login_path: default_admin_login_path(),
            customer_login_path: default_customer_login_path(),
            inventory_items_path: default_inventory_items_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where the session token and role tag are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Service name used for the platform credential store
    #[serde(default = "default_service")]
    pub service: String,

    /// Key under which the bearer token is stored
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// Key under which the role tag is stored
    #[serde(default = "default_role_key")]
    pub role_key: String,
}

fn default_service() -> String {
    "stockroom".to_string()
}

fn default_token_key() -> String {
    "APP_JWT".to_string()
}

fn default_role_key() -> String {
    "APP_USER_TYPE".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            token_key: default_token_key(),
            role_key: default_role_key(),
        }
    }
}

/// Presentation settings for inventory listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Currency symbol shown before prices
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Quantities at or below this count are flagged as low stock
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_low_stock_threshold() -> i64 {
    5
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}
