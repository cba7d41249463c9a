//! Inventory data and backend operations

pub mod models;
pub mod service;

pub use models::{Item, ItemPatch, NewItem};
pub use service::InventoryService;
