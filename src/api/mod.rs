//! HTTP access to the webhook backend

pub mod client;
pub mod response;

pub use client::{ApiClient, TokenBinding, UnauthorizedHook};
pub use response::{extract_items, extract_token, find_token, unwrap_body, ProxyEnvelope};
