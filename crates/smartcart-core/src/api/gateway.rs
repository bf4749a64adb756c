//! Authenticated request gateway.
//!
//! Every call to the backend goes through here. Outbound requests get the
//! current bearer token attached; a 401 response whose body names an expired
//! access token triggers a single refresh against `POST /auth/refresh` (the
//! refresh token travels as an HTTP-only cookie in the client's cookie store)
//! followed by one replay of the original request. Anything else - network
//! failures, other statuses, 401s with a different reason - is handed back to
//! the caller untouched.
//!
//! Concurrent expired-token failures coalesce: only one refresh call is in
//! flight at a time, and waiters reuse whatever that refresh produced.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenStore;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Refresh endpoint. Takes no body; the refresh token rides in as a cookie.
const REFRESH_PATH: &str = "/auth/refresh";

/// Body discriminator the backend uses for an expired access token.
/// Other 401 reasons ("Invalid token", "Inactive user") must not trigger
/// a refresh.
const EXPIRED_TOKEN_DETAIL: &str = "Token expired";

/// Initial dispatch plus at most one replay after a token refresh.
const MAX_AUTH_ATTEMPTS: u8 = 2;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// Standard error body shape of the backend: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// True if a 401 body carries the expired-token discriminator.
fn expired_token_detail(body: &str) -> bool {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .is_some_and(|detail| detail == EXPIRED_TOKEN_DETAIL)
}

/// Set or remove the bearer header on a request descriptor.
fn authorize(mut request: Request, token: Option<&str>) -> Result<Request, ApiError> {
    match token {
        Some(token) => {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidCredential(e.to_string()))?;
            request.headers_mut().insert(header::AUTHORIZATION, value);
        }
        None => {
            request.headers_mut().remove(header::AUTHORIZATION);
        }
    }
    Ok(request)
}

/// Gateway for authenticated calls to the smart-cart backend.
///
/// Token storage is injected so tests and embedders can substitute an
/// in-memory store; observers registered via [`Gateway::on_session_expired`]
/// are invoked when a refresh terminally fails and the session is cleared.
pub struct Gateway {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    refresh_gate: tokio::sync::Mutex<()>,
    expired_observers: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
}

impl Gateway {
    /// Create a gateway for the given base URL (e.g. `https://host/api`).
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            refresh_gate: tokio::sync::Mutex::new(()),
            expired_observers: Mutex::new(Vec::new()),
        })
    }

    /// Register an observer invoked when the session terminally expires
    /// (refresh failed, stored token cleared). The UI layer hangs its
    /// re-login prompt off this.
    pub fn on_session_expired(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.expired_observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(observer));
    }

    /// Persist a freshly issued access token (login path).
    pub fn store_token(&self, token: &str) -> Result<()> {
        self.tokens.store(token)
    }

    /// Drop the stored access token (logout path).
    pub fn clear_token(&self) -> Result<()> {
        self.tokens.clear()
    }

    pub fn has_token(&self) -> bool {
        self.tokens.access_token().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Typed request helpers =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http.get(self.url(path)).build()?;
        self.send_json(request).await
    }

    pub async fn get_with<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        let request = self.http.get(self.url(path)).query(query).build()?;
        self.send_json(request).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.http.post(self.url(path)).json(body).build()?;
        self.send_json(request).await
    }

    /// POST with an empty body, parsing the response.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http.post(self.url(path)).build()?;
        self.send_json(request).await
    }

    /// POST with an empty body, discarding the response body.
    pub async fn post_unit(&self, path: &str) -> Result<()> {
        let request = self.http.post(self.url(path)).build()?;
        self.send_unit(request).await
    }

    pub async fn post_unit_with<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.http.post(self.url(path)).json(body).build()?;
        self.send_unit(request).await
    }

    pub async fn patch_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.http.patch(self.url(path)).json(body).build()?;
        self.send_unit(request).await
    }

    pub async fn delete_unit(&self, path: &str) -> Result<()> {
        let request = self.http.delete(self.url(path)).build()?;
        self.send_unit(request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let url = request.url().to_string();
        let response = self.dispatch(request).await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn send_unit(&self, request: Request) -> Result<()> {
        let response = self.dispatch(request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Check if a response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    // ===== Interception core =====

    /// Dispatch a request with bearer auth attached, transparently refreshing
    /// an expired access token once and replaying the original request.
    ///
    /// The attempt counter bounds the loop: a replay that fails again with an
    /// expired-token 401 surfaces that failure instead of refreshing twice.
    async fn dispatch(&self, request: Request) -> Result<Response, ApiError> {
        let mut attempt: u8 = 1;
        let mut stale = self.tokens.access_token();
        let mut request = authorize(request, stale.as_deref())?;

        loop {
            // Clone before sending: the body is consumed on dispatch and a
            // replay needs the original descriptor.
            let replay = if attempt < MAX_AUTH_ATTEMPTS {
                request.try_clone()
            } else {
                None
            };
            let url = request.url().clone();

            let response = self.http.execute(request).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if !expired_token_detail(&body) {
                return Err(ApiError::from_status(StatusCode::UNAUTHORIZED, &body));
            }

            let Some(next) = replay else {
                warn!(url = %url, "Replayed request still unauthorized, giving up");
                return Err(ApiError::from_status(StatusCode::UNAUTHORIZED, &body));
            };

            debug!(url = %url, "Access token expired, refreshing");
            let token = match self.refresh_access_token(stale.as_deref()).await {
                Ok(token) => token,
                Err(err) => {
                    warn!(error = %err, "Token refresh failed, clearing session");
                    if let Err(err) = self.tokens.clear() {
                        warn!(error = %err, "Failed to clear stored token");
                    }
                    self.notify_session_expired();
                    // The caller sees the original failure, not the refresh's.
                    return Err(ApiError::from_status(StatusCode::UNAUTHORIZED, &body));
                }
            };

            request = authorize(next, Some(&token))?;
            stale = Some(token);
            attempt += 1;
        }
    }

    /// Exchange the refresh cookie for a new access token.
    ///
    /// `stale` is the token the failing request carried. Refreshes coalesce
    /// behind a single gate: a waiter that finds the store already rotated
    /// past `stale` reuses that token, and one that finds the store cleared
    /// treats the refresh as already failed.
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        match self.tokens.access_token() {
            Some(current) if Some(current.as_str()) != stale => {
                debug!("Token already refreshed by a concurrent request");
                return Ok(current);
            }
            None if stale.is_some() => {
                return Err(ApiError::RefreshFailed(
                    "session cleared by a concurrent refresh failure".to_string(),
                ));
            }
            _ => {}
        }

        let response = self.http.post(self.url(REFRESH_PATH)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let refreshed: RefreshResponse = response.json().await?;
        self.tokens
            .store(&refreshed.access_token)
            .map_err(|e| ApiError::RefreshFailed(e.to_string()))?;

        debug!("Access token refreshed");
        Ok(refreshed.access_token)
    }

    fn notify_session_expired(&self) {
        let observers = self
            .expired_observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            observer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_token_detail() {
        assert!(expired_token_detail(r#"{"detail": "Token expired"}"#));

        // Other 401 reasons must not classify as expiry
        assert!(!expired_token_detail(r#"{"detail": "Invalid token"}"#));
        assert!(!expired_token_detail(r#"{"detail": "Inactive user"}"#));
        assert!(!expired_token_detail(r#"{"detail": null}"#));
        assert!(!expired_token_detail(r#"{}"#));
        assert!(!expired_token_detail("Token expired"));
        assert!(!expired_token_detail(""));
    }

    #[test]
    fn test_classification_is_stable() {
        let body = r#"{"detail": "Token expired"}"#;
        for _ in 0..3 {
            assert!(expired_token_detail(body));
        }
    }

    #[test]
    fn test_authorize_sets_and_removes_bearer() {
        let client = Client::new();

        let request = client.get("http://localhost/resource").build().unwrap();
        let request = authorize(request, Some("T1")).unwrap();
        assert_eq!(
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok()),
            Some("Bearer T1")
        );

        // Replacing an existing header keeps exactly one value
        let request = authorize(request, Some("T2")).unwrap();
        assert_eq!(
            request
                .headers()
                .get_all(header::AUTHORIZATION)
                .iter()
                .count(),
            1
        );

        let request = authorize(request, None).unwrap();
        assert!(request.headers().get(header::AUTHORIZATION).is_none());
    }
}
