//! Authentication and session management

pub mod claims;
pub mod models;
pub mod session;
pub mod store;

pub use claims::{decode_claims, looks_like_jwt, Claims};
pub use models::{AdminCredentials, CustomerProfile, Role, SessionState, User};
pub use session::SessionManager;
pub use store::{CredentialBackend, CredentialStore, FileBackend, KeyringBackend};
