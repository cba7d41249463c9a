//! Authentication models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which login flow a user came through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator - manages the inventory
    Admin,
    /// Customer - browses and orders
    Customer,
}

impl Role {
    /// Fallback display name when the token omits a name claim
    pub fn default_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Customer => "Customer",
        }
    }

    /// Fallback identifier when the token carries neither `sub` nor `id`
    pub fn default_id(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Customer => write!(f, "customer"),
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            _ => Err(()),
        }
    }
}

/// Signed-in user identity, built from token claims with login-form fallbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

/// Admin login form
#[derive(Debug, Clone, Serialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// Customer login form; only the name is required
#[derive(Debug, Clone, Serialize)]
pub struct CustomerProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The authoritative in-memory auth state.
///
/// Invariant: `user` and `token` are either both set or both `None`; a
/// half-populated pair is treated as signed out everywhere.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub role: Option<Role>,
    /// True while restoration or a sign-in/sign-out is in flight. Callers
    /// should treat the session as indeterminate and make no routing
    /// decision until this clears.
    pub is_loading: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert!("viewer".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::Customer.to_string(), "customer");
    }

    #[test]
    fn test_session_state_invariant() {
        let mut state = SessionState::default();
        assert!(!state.is_authenticated());

        state.token = Some("t".into());
        // token without user is not authenticated
        assert!(!state.is_authenticated());

        state.user = Some(User {
            id: "1".into(),
            name: "Ada".into(),
            email: None,
            phone: None,
            role: Role::Admin,
        });
        assert!(state.is_authenticated());
    }

    #[test]
    fn test_customer_profile_skips_empty_fields() {
        let profile = CustomerProfile {
            name: "Sam".into(),
            email: None,
            phone: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("phone").is_none());
    }
}
