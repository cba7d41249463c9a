//! Inventory item model and row normalization
//!
//! The backend's rows come from whatever the webhook is wired to - a
//! spreadsheet export with headers like "Item ID" and "Quantity Available",
//! or an API with camelCase keys. Lookup is by exact candidate name first,
//! then by a case- and whitespace-insensitive match, and numbers arrive as
//! numbers or as strings depending on the deployment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inventory item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub qty: i64,
    pub price: f64,
    pub expiry_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

impl Item {
    /// Build an item from a loosely-keyed backend row
    pub fn from_row(row: &Value) -> Self {
        let id = lookup(row, &["Item ID", "itemId", "id"])
            .and_then(string_value)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let name = lookup(row, &["Item Name", "name"])
            .and_then(string_value)
            .unwrap_or_default();
        let price = lookup(row, &["Item Price", "price"])
            .map(number_value)
            .unwrap_or(0.0);
        let qty = lookup(row, &["Quantity Available", "qty", "quantity"])
            .map(integer_value)
            .unwrap_or(0);
        let expiry_date = lookup(row, &["Expiry Date", "expiryDate"])
            .and_then(string_value)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        let description = lookup(row, &["Description", "description"]).and_then(string_value);
        let photo_url = lookup(row, &["Photo URL", "photoUrl"]).and_then(string_value);

        Self {
            id,
            name,
            qty,
            price,
            expiry_date,
            description,
            photo_url,
        }
    }

    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.qty <= threshold
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expiry_date, Some(date) if date < today)
    }
}

/// New item payload, serialized with the upstream field names
#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    pub name: String,
    pub qty: i64,
    pub price: f64,
    #[serde(rename = "expiryDate", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update payload
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(rename = "expiryDate", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.qty.is_none()
            && self.price.is_none()
            && self.expiry_date.is_none()
            && self.description.is_none()
    }
}

/// Exact candidate names first, then a normalized (trimmed, lowercased,
/// whitespace-stripped) match against the row's actual keys.
fn lookup<'a>(row: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    let obj = row.as_object()?;

    for candidate in candidates {
        if let Some(value) = obj.get(*candidate) {
            return Some(value);
        }
    }

    for candidate in candidates {
        let wanted = normalize_key(candidate);
        for (key, value) in obj {
            if normalize_key(key) == wanted {
                return Some(value);
            }
        }
    }

    None
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn integer_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}
