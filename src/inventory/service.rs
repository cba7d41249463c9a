//! Inventory CRUD against the webhook backend
//!
//! The backend multiplexes writes over one endpoint with an `operation`
//! discriminator in the body (the webhook's switch node routes on it);
//! reads are a plain GET. Every response goes through the proxy-envelope
//! normalization before any rows are read.

use crate::api::{self, ApiClient};
use crate::error::Result;
use crate::inventory::models::{Item, ItemPatch, NewItem};
use serde_json::json;
use std::sync::Arc;

pub struct InventoryService {
    client: Arc<ApiClient>,
    items_path: String,
}

impl InventoryService {
    pub fn new(client: Arc<ApiClient>, items_path: &str) -> Self {
        Self {
            client,
            items_path: items_path.to_string(),
        }
    }

    /// Fetch all items, whatever shape the backend wrapped them in
    pub async fn list(&self) -> Result<Vec<Item>> {
        let response = self.client.get(&self.items_path).await?;
        let rows = api::extract_items(&response);
        tracing::debug!(rows = rows.len(), "fetched inventory listing");
        Ok(rows.iter().map(Item::from_row).collect())
    }

    /// Create an item. The backend echoes an id when it assigns one; a
    /// local id fills in otherwise so the caller always gets a usable item.
    pub async fn create(&self, new_item: NewItem) -> Result<Item> {
        let body = json!({
            "operation": "POST",
            "data": new_item,
        });
        let response = self.client.post(&self.items_path, &body).await?;

        let id = api::unwrap_body(&response)
            .as_ref()
            .and_then(|payload| payload.get("itemId"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Item {
            id,
            name: new_item.name,
            qty: new_item.qty,
            price: new_item.price,
            expiry_date: new_item.expiry_date,
            description: new_item.description,
            photo_url: None,
        })
    }

    /// Apply a partial update to an item
    pub async fn update(&self, item_id: &str, patch: ItemPatch) -> Result<()> {
        let body = json!({
            "operation": "UPDATE",
            "itemId": item_id,
            "data": patch,
        });
        self.client.post(&self.items_path, &body).await?;
        tracing::debug!(item_id, "updated item");
        Ok(())
    }

    /// Delete an item
    pub async fn delete(&self, item_id: &str) -> Result<()> {
        let body = json!({
            "operation": "DELETE",
            "itemId": item_id,
        });
        self.client.post(&self.items_path, &body).await?;
        tracing::debug!(item_id, "deleted item");
        Ok(())
    }
}
