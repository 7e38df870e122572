use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, REFERER};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::csrf::CsrfBootstrap;
use super::types::CsrfResponse;
use crate::config::{ApiConfig, RequestConfig};
use crate::error::{ApiError, ApiResult};

/// Path of the CSRF bootstrap endpoint.
pub const CSRF_PATH: &str = "/api/auth/csrf/";
/// Cookie the backend stores the CSRF token in.
pub const CSRF_COOKIE: &str = "csrftoken";
/// Header mutating requests carry the CSRF token in.
pub const CSRF_HEADER: &str = "X-CSRFToken";
/// Statuses that make an idempotent request eligible for another attempt.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Client for the KlinikDeutsch backend.
///
/// Clones share the cookie jar (session and CSRF cookies) and the CSRF
/// bootstrap, so one logical session can be driven from several tasks.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    origin: Url,
    jar: Arc<Jar>,
    csrf: CsrfBootstrap,
    request_config: RequestConfig,
}

impl ApiClient {
    /// Create a new backend client
    pub fn new(config: &ApiConfig, request_config: RequestConfig) -> ApiResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let origin = Url::parse(&base_url).map_err(|e| ApiError::Client {
            message: format!("Invalid base URL {}: {}", base_url, e),
        })?;

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(|e| ApiError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            origin,
            jar,
            csrf: CsrfBootstrap::new(),
            request_config,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the CSRF bootstrap has completed
    pub fn csrf_ready(&self) -> bool {
        self.csrf.is_ready()
    }

    /// Send a GET request and decode the JSON response
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    /// Send a POST request with a JSON body and decode the JSON response
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Send one logical request.
    ///
    /// Mutating methods bootstrap CSRF first and are sent exactly once.
    /// Idempotent methods are retried on transport failure or a retryable
    /// status, with linear backoff.
    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let csrf_token = if is_mutating(&method) {
            Some(self.csrf_header_value().await?)
        } else {
            None
        };

        self.send_with_retry(method, path, body, csrf_token.as_deref())
            .await
    }

    /// Ensure the CSRF cookie has been obtained (at most one fetch per client).
    pub async fn ensure_csrf(&self) -> ApiResult<String> {
        self.csrf.ensure(|| self.fetch_csrf_token()).await
    }

    /// Token to attach to a mutating request.
    ///
    /// The backend rotates the cookie on login, so the jar's current value
    /// wins over the one captured at bootstrap.
    async fn csrf_header_value(&self) -> ApiResult<String> {
        let bootstrapped = self.ensure_csrf().await?;
        Ok(self.cookie_value(CSRF_COOKIE).unwrap_or(bootstrapped))
    }

    async fn fetch_csrf_token(&self) -> ApiResult<String> {
        let response: CsrfResponse = self
            .send_with_retry::<(), _>(Method::GET, CSRF_PATH, None, None)
            .await?;

        let token = self
            .cookie_value(CSRF_COOKIE)
            .or(response.csrf_token)
            .ok_or_else(|| ApiError::Csrf {
                message: "response carried neither a csrftoken cookie nor a csrfToken field"
                    .to_string(),
            })?;

        info!("CSRF token bootstrapped");
        Ok(token)
    }

    /// Current value of a cookie held for the backend origin.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        let cookies = header.to_str().ok()?;
        cookies.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    async fn send_with_retry<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        csrf_token: Option<&str>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let max_retries = if is_idempotent(&method) {
            self.request_config.max_retries
        } else {
            0
        };

        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                let delay = backoff_delay(self.request_config.retry_delay_ms, attempt);
                warn!(
                    method = %method,
                    path = %path,
                    retry = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self
                .execute_request(&method, &url, path, body, csrf_token)
                .await
            {
                Ok(response) => {
                    debug!(
                        method = %method,
                        path = %path,
                        latency_ms = start.elapsed().as_millis(),
                        retries = attempt,
                        "Request succeeded"
                    );
                    return Ok(response);
                }
                Err(e) if attempt < max_retries && is_retryable(&e) => {
                    warn!(
                        method = %method,
                        path = %path,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = attempt,
                        "Request attempt failed"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        method = %method,
                        path = %path,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retries = attempt,
                        "Request failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Execute a single attempt (internal)
    async fn execute_request<B, T>(
        &self,
        method: &Method,
        url: &str,
        path: &str,
        body: Option<&B>,
        csrf_token: Option<&str>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method = %method, path = %path, "Calling backend");

        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");

        if let Some(token) = csrf_token {
            builder = builder
                .header(CSRF_HEADER, token)
                .header(REFERER, format!("{}/", self.base_url));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                ApiError::Network {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();

        debug!(method = %method, path = %path, status = status.as_u16(), "Backend responded");

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = extract_detail(&error_body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
            return Err(ApiError::from_status(status.as_u16(), detail));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                ApiError::InvalidResponse {
                    message: format!("Failed to parse response from {}: {}", path, e),
                }
            }
        })
    }
}

/// GET, HEAD and OPTIONS may be retried without duplicating side effects.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Methods that must carry the CSRF header.
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Whether a failed attempt may be retried (idempotent methods only).
pub fn is_retryable(err: &ApiError) -> bool {
    match err {
        ApiError::Network { .. } | ApiError::Timeout { .. } => true,
        other => other
            .status()
            .map(|s| RETRYABLE_STATUSES.contains(&s))
            .unwrap_or(false),
    }
}

/// Linear backoff: retry `n` waits `n * unit_ms`.
pub fn backoff_delay(unit_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(unit_ms.saturating_mul(u64::from(attempt)))
}

/// Pull the human-readable message out of an error body.
///
/// Prefers a JSON `detail` field, falls back to the trimmed raw body.
fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return Some(detail.to_string());
        }
    }

    Some(trimmed.chars().take(500).collect())
}
