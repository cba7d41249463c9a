//! Shared HTTP client for the proxy endpoint
//!
//! One reqwest client is built at startup and shared everywhere. The bearer
//! token lives in a [`TokenBinding`] cell owned by the session manager -
//! the client only ever reads it, so there is exactly one writer for the
//! process-wide authorization state. A 401 from any call runs the
//! registered unauthorized hook once for that call, then the error still
//! reaches the original caller.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Callback run when a request comes back unauthorized. Wired to the
/// session manager's forced sign-out.
pub type UnauthorizedHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Shared cell holding the current bearer token.
///
/// Single-writer: only the session manager sets or clears it, mirroring the
/// token field of the in-memory session state. The HTTP client holds a
/// clone and reads it per request.
#[derive(Clone, Default)]
pub struct TokenBinding {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: &str) {
        *self.inner.write().expect("token binding lock poisoned") = Some(token.to_string());
    }

    pub fn clear(&self) {
        *self.inner.write().expect("token binding lock poisoned") = None;
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().expect("token binding lock poisoned").clone()
    }
}

/// Thin wrapper over one shared reqwest client, aimed at the proxy
pub struct ApiClient {
    http: reqwest::Client,
    proxy_base: String,
    binding: TokenBinding,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, binding: TokenBinding) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            proxy_base: config.proxy_base.clone(),
            binding,
            on_unauthorized: RwLock::new(None),
        })
    }

    /// Register the callback fired on authentication failures
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        *self
            .on_unauthorized
            .write()
            .expect("unauthorized hook lock poisoned") = Some(hook);
    }

    /// GET a webhook path through the proxy
    pub async fn get(&self, path: &str) -> Result<Value> {
        let request = self
            .http
            .get(&self.proxy_base)
            .query(&[("path", clean_path(path))]);
        self.execute(request).await
    }

    /// POST a JSON body to a webhook path through the proxy
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let request = self
            .http
            .post(&self.proxy_base)
            .query(&[("path", clean_path(path))])
            .json(body);
        self.execute(request).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let request = match self.binding.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("request came back unauthorized, running sign-out hook");
            let hook = self
                .on_unauthorized
                .read()
                .expect("unauthorized hook lock poisoned")
                .clone();
            if let Some(hook) = hook {
                // Once per failing call, awaited before the caller sees the
                // error so no request races a half-cleared session.
                hook().await;
            }
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body, &status),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Webhook paths are passed as a query value; the proxy rejects leading
/// slashes.
fn clean_path(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// Best human-readable message for a failed call
fn error_message(body: &Value, status: &StatusCode) -> String {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_binding_single_cell() {
        let binding = TokenBinding::new();
        let reader = binding.clone();

        assert!(reader.get().is_none());
        binding.set("a.b.c");
        assert_eq!(reader.get().as_deref(), Some("a.b.c"));
        binding.clear();
        assert!(reader.get().is_none());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/inventory/items"), "inventory/items");
        assert_eq!(clean_path("///auth/admin/login"), "auth/admin/login");
        assert_eq!(clean_path("auth/admin/login"), "auth/admin/login");
    }

    #[test]
    fn test_error_message_prefers_body_fields() {
        let status = StatusCode::UNPROCESSABLE_ENTITY;
        assert_eq!(
            error_message(&json!({"message": "qty must be positive"}), &status),
            "qty must be positive"
        );
        assert_eq!(
            error_message(&json!({"error": "bad row"}), &status),
            "bad row"
        );
        assert_eq!(
            error_message(&Value::Null, &status),
            "Unprocessable Entity"
        );
    }
}
