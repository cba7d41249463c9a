//! Session management
//!
//! Owns the in-memory auth state and keeps it consistent with the
//! credential store and the HTTP client's token binding. All mutation goes
//! through three operations - startup restore, sign-in, sign-out - and
//! state transitions are applied only after their triggering I/O has
//! completed, so callers never observe a half-updated session.
//!
//! Sign-in and sign-out are serialized behind an operation gate so a
//! double-submitted login cannot interleave. The forced sign-out path
//! (driven by the HTTP 401 hook) deliberately bypasses the gate - it can
//! fire from inside a gated sign-in's own request - and instead bumps an
//! epoch counter that gated operations check before committing, so a
//! sign-out always wins over any sign-in still in flight.

use crate::api::{self, ApiClient, TokenBinding};
use crate::auth::claims::{decode_claims, looks_like_jwt, Claims};
use crate::auth::models::{AdminCredentials, CustomerProfile, Role, SessionState, User};
use crate::auth::store::CredentialStore;
use crate::config::Config;
use crate::error::{Error, Result};
use futures_util::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Login-form values used when the token omits the matching claim
struct UserFallback {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

struct Inner {
    state: RwLock<SessionState>,
    store: CredentialStore,
    client: Arc<ApiClient>,
    binding: TokenBinding,
    admin_login_path: String,
    customer_login_path: String,
    /// Serializes sign-in/sign-out started through the public API
    op_gate: Mutex<()>,
    /// Bumped by every sign-out; in-flight sign-ins refuse to commit when
    /// it moved under them
    signout_epoch: AtomicU64,
}

/// In-memory auth state machine
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SessionManager {
    pub fn new(
        config: &Config,
        client: Arc<ApiClient>,
        store: CredentialStore,
        binding: TokenBinding,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                // Indeterminate until restore() has run
                state: RwLock::new(SessionState {
                    is_loading: true,
                    ..SessionState::default()
                }),
                store,
                client,
                binding,
                admin_login_path: config.api.admin_login_path.clone(),
                customer_login_path: config.api.customer_login_path.clone(),
                op_gate: Mutex::new(()),
                signout_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Wire this manager's forced sign-out into the HTTP client's 401 path
    pub fn install_unauthorized_hook(&self) {
        let manager = self.clone();
        self.inner.client.set_unauthorized_hook(Arc::new(move || {
            let manager = manager.clone();
            async move { manager.force_sign_out().await }.boxed()
        }));
    }

    /// Startup restoration. Loads the persisted token and role tag, cross
    /// checks them, and settles into either an authenticated or an
    /// anonymous session. Never fails: anything suspect demotes silently to
    /// signed out and purges storage.
    pub async fn restore(&self) {
        self.set_loading(true);

        let token = self.inner.store.token();
        let role_tag = self.inner.store.role();

        match (token, role_tag) {
            (Some(token), Some(role_tag)) => {
                let role = match role_tag.parse::<Role>() {
                    Ok(role) => role,
                    Err(()) => {
                        tracing::warn!(tag = role_tag.as_str(), "unknown stored role tag");
                        self.purge_and_settle_anonymous();
                        return;
                    }
                };

                match decode_claims(&token) {
                    Some(claims) if claims.role.as_deref() == Some(role_tag.as_str()) => {
                        let user = build_user(&claims, role, &UserFallback {
                            name: None,
                            email: None,
                            phone: None,
                        });
                        self.inner.binding.set(&token);
                        self.commit_authenticated(user, token, role);
                        tracing::info!(role = %role, "restored session from storage");
                    }
                    _ => {
                        // Corrupted or stale: token undecodable, or its role
                        // claim disagrees with the stored tag
                        tracing::warn!("stored session failed validation, clearing it");
                        self.purge_and_settle_anonymous();
                    }
                }
            }
            (None, None) => {
                self.settle_anonymous();
            }
            _ => {
                // Half-written pair: one key present without the other
                tracing::warn!("partial stored session detected, clearing it");
                self.purge_and_settle_anonymous();
            }
        }
    }

    /// Sign in through the admin endpoint. The decoded token must claim the
    /// admin role.
    pub async fn sign_in_admin(&self, email: &str, password: &str) -> Result<User> {
        let _gate = self.inner.op_gate.lock().await;
        let epoch = self.inner.signout_epoch.load(Ordering::SeqCst);
        self.set_loading(true);

        let credentials = AdminCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let fallback = UserFallback {
            name: None,
            email: Some(email.to_string()),
            phone: None,
        };

        let path = self.inner.admin_login_path.clone();
        let result = self
            .complete_sign_in(Role::Admin, &path, &credentials, fallback, epoch)
            .await;

        if result.is_err() {
            self.set_loading(false);
        }
        result
    }

    /// Sign in through the customer endpoint. The decoded token must claim
    /// the customer role.
    pub async fn sign_in_customer(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User> {
        let _gate = self.inner.op_gate.lock().await;
        let epoch = self.inner.signout_epoch.load(Ordering::SeqCst);
        self.set_loading(true);

        let profile = CustomerProfile {
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
        };
        let fallback = UserFallback {
            name: Some(name.to_string()),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
        };

        let path = self.inner.customer_login_path.clone();
        let result = self
            .complete_sign_in(Role::Customer, &path, &profile, fallback, epoch)
            .await;

        if result.is_err() {
            self.set_loading(false);
        }
        result
    }

    /// Explicit sign-out. Idempotent, never fails.
    pub async fn sign_out(&self) {
        let _gate = self.inner.op_gate.lock().await;
        self.sign_out_inner();
    }

    /// Forced sign-out, wired to the HTTP client's 401 hook. Skips the
    /// operation gate: the hook can fire from inside a gated sign-in's own
    /// request, where waiting on the gate would deadlock. The epoch bump
    /// keeps that sign-in from committing afterwards.
    pub async fn force_sign_out(&self) {
        self.sign_out_inner();
    }

    fn sign_out_inner(&self) {
        self.inner.signout_epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.store.clear();
        self.inner.binding.clear();
        self.settle_anonymous();
        tracing::info!("signed out");
    }

    // Pure reads of the current state

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.read().expect("session state lock poisoned").clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.snapshot().user, Some(User { role: Role::Admin, .. }))
    }

    pub fn is_customer(&self) -> bool {
        matches!(self.snapshot().user, Some(User { role: Role::Customer, .. }))
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot().user
    }

    async fn complete_sign_in<B: serde::Serialize>(
        &self,
        role: Role,
        path: &str,
        payload: &B,
        fallback: UserFallback,
        epoch: u64,
    ) -> Result<User> {
        let response = self.inner.client.post(path, payload).await?;
        tracing::debug!(role = %role, "login response received");

        // Canonical extraction order; a previously stored token is the last
        // resort when the response hid it from every strategy.
        let token = api::extract_token(&response)
            .or_else(|| self.inner.store.token())
            .ok_or(Error::InvalidCredentialResponse)?;

        if !looks_like_jwt(&token) {
            tracing::warn!("login produced a token without the expected shape");
            return Err(Error::InvalidCredentialResponse);
        }

        let claims = decode_claims(&token).ok_or(Error::MalformedToken)?;

        let claimed_role = claims.role.clone().unwrap_or_default();
        if claimed_role != role.to_string() {
            return Err(Error::RoleMismatch {
                expected: role.to_string(),
                actual: claimed_role,
            });
        }

        // A sign-out won the race while the request was in flight; do not
        // resurrect the cleared session.
        if self.inner.signout_epoch.load(Ordering::SeqCst) != epoch {
            tracing::warn!("sign-out during sign-in, discarding the new session");
            return Err(Error::SignInAborted);
        }

        // Persist first, then install the header, then commit. A storage
        // failure is logged but does not abort the sign-in: the in-memory
        // session is still valid for this process.
        if let Err(e) = self.inner.store.store(&token, &role.to_string()) {
            tracing::warn!("failed to persist session: {}", e);
        }
        self.inner.binding.set(&token);

        let user = build_user(&claims, role, &fallback);
        self.commit_authenticated(user.clone(), token, role);
        tracing::info!(role = %role, "signed in");

        Ok(user)
    }

    fn commit_authenticated(&self, user: User, token: String, role: Role) {
        let mut state = self.inner.state.write().expect("session state lock poisoned");
        state.user = Some(user);
        state.token = Some(token);
        state.role = Some(role);
        state.is_loading = false;
    }

    fn settle_anonymous(&self) {
        let mut state = self.inner.state.write().expect("session state lock poisoned");
        state.user = None;
        state.token = None;
        state.role = None;
        state.is_loading = false;
    }

    fn purge_and_settle_anonymous(&self) {
        self.inner.store.clear();
        self.inner.binding.clear();
        self.settle_anonymous();
    }

    fn set_loading(&self, loading: bool) {
        self.inner
            .state
            .write()
            .expect("session state lock poisoned")
            .is_loading = loading;
    }
}

/// Claims win, login-form values fill the gaps, role defaults cover the rest
fn build_user(claims: &Claims, role: Role, fallback: &UserFallback) -> User {
    User {
        id: claims
            .subject()
            .map(str::to_string)
            .unwrap_or_else(|| role.default_id().to_string()),
        name: claims
            .name
            .clone()
            .or_else(|| fallback.name.clone())
            .unwrap_or_else(|| role.default_name().to_string()),
        email: claims.email.clone().or_else(|| fallback.email.clone()),
        phone: claims.phone.clone().or_else(|| fallback.phone.clone()),
        role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{CredentialBackend, FileBackend};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use serde_json::json;
    use tempfile::TempDir;

    fn make_token(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{}.{}.sig", header, body)
    }

    fn manager_with_store(dir: &TempDir) -> (SessionManager, CredentialStore) {
        let config = Config::default();
        let binding = TokenBinding::new();
        let client = Arc::new(ApiClient::new(&config.api, binding.clone()).unwrap());

        let backend = || -> Box<dyn CredentialBackend> {
            Box::new(FileBackend::new(dir.path().join("credentials.json")))
        };
        let store = CredentialStore::with_backend(backend(), "APP_JWT", "APP_USER_TYPE");
        let probe = CredentialStore::with_backend(backend(), "APP_JWT", "APP_USER_TYPE");

        (SessionManager::new(&config, client, store, binding), probe)
    }

    #[tokio::test]
    async fn test_fresh_manager_is_loading() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager_with_store(&dir);

        let state = manager.snapshot();
        assert!(state.is_loading);
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_with_empty_storage() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager_with_store(&dir);

        manager.restore().await;

        let state = manager.snapshot();
        assert!(!state.is_loading);
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_valid_session() {
        let dir = TempDir::new().unwrap();
        let (manager, probe) = manager_with_store(&dir);

        let token = make_token(json!({"sub": "u-9", "role": "admin", "name": "Ada"}));
        probe.store(&token, "admin").unwrap();

        manager.restore().await;

        assert!(manager.is_authenticated());
        assert!(manager.is_admin());
        let user = manager.current_user().unwrap();
        assert_eq!(user.id, "u-9");
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test]
    async fn test_restore_role_tag_mismatch_purges() {
        let dir = TempDir::new().unwrap();
        let (manager, probe) = manager_with_store(&dir);

        // Stored tag says admin, token claims customer
        let token = make_token(json!({"sub": "u-9", "role": "customer"}));
        probe.store(&token, "admin").unwrap();

        manager.restore().await;

        assert!(!manager.is_authenticated());
        assert!(probe.token().is_none());
        assert!(probe.role().is_none());
    }

    #[tokio::test]
    async fn test_restore_undecodable_token_purges() {
        let dir = TempDir::new().unwrap();
        let (manager, probe) = manager_with_store(&dir);

        probe.store("garbage-not-a-jwt", "admin").unwrap();
        manager.restore().await;

        assert!(!manager.is_authenticated());
        assert!(probe.token().is_none());
    }

    #[tokio::test]
    async fn test_restore_partial_pair_purges() {
        let dir = TempDir::new().unwrap();
        let (manager, probe) = manager_with_store(&dir);

        // Token present without its role tag
        let token = make_token(json!({"sub": "u-1", "role": "admin"}));
        let backend = FileBackend::new(dir.path().join("credentials.json"));
        backend.save("APP_JWT", &token).unwrap();

        manager.restore().await;

        assert!(!manager.is_authenticated());
        assert!(probe.token().is_none());
    }

    #[tokio::test]
    async fn test_restore_uses_default_name_when_claim_missing() {
        let dir = TempDir::new().unwrap();
        let (manager, probe) = manager_with_store(&dir);

        let token = make_token(json!({"sub": "c-2", "role": "customer"}));
        probe.store(&token, "customer").unwrap();

        manager.restore().await;

        let user = manager.current_user().unwrap();
        assert_eq!(user.name, "Customer");
        assert!(manager.is_customer());
    }

    #[tokio::test]
    async fn test_sign_out_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (manager, probe) = manager_with_store(&dir);

        let token = make_token(json!({"sub": "u-9", "role": "admin"}));
        probe.store(&token, "admin").unwrap();
        manager.restore().await;
        assert!(manager.is_authenticated());

        manager.sign_out().await;
        let first = manager.snapshot();
        manager.sign_out().await;
        let second = manager.snapshot();

        assert!(!first.is_authenticated());
        assert!(!second.is_authenticated());
        assert!(!second.is_loading);
        assert!(probe.token().is_none());
    }
}
