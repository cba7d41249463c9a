//! Unverified token payload decoding
//!
//! The backend issues compact three-segment tokens. Only the middle
//! (payload) segment is ever read, and the signature is never checked:
//! this is claims extraction for display and routing, not an authorization
//! decision. The backend verifies tokens on every request it serves.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded (unverified) token payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Claims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,
    /// Some backends put the user ID here instead of `sub`
    #[serde(default)]
    pub id: Option<String>,
    /// Role tag: "admin" or "customer"
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Issued at
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiration time
    #[serde(default)]
    pub exp: Option<i64>,
    /// Anything else the backend decided to include
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// The user identifier, whichever claim the backend used for it
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.id.as_deref())
    }
}

/// Quick shape check: three non-empty period-separated segments
pub fn looks_like_jwt(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
}

/// Decode the payload segment of a compact token without verifying the
/// signature. Returns `None` on any malformation; this sits on the hot path
/// of every session check and must never panic or propagate an error.
pub fn decode_claims(token: &str) -> Option<Claims> {
    if token.is_empty() {
        return None;
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let bytes = decode_base64url(parts[1])?;
    serde_json::from_slice(&bytes).ok()
}

/// base64url -> base64: swap the URL-safe alphabet back and re-pad to a
/// multiple of four before handing off to the standard decoder.
fn decode_base64url(segment: &str) -> Option<Vec<u8>> {
    let mut normalized = segment.replace('-', "+").replace('_', "/");
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    STANDARD.decode(normalized).ok()
}
