//! HTTP retry helpers for transient errors.
//!
//! Feed fetchers use [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! exponential backoff on connection failures, timeouts, HTTP 429, and
//! HTTP 5xx. Other 4xx responses are permanent and fail immediately.
//!
//! Retries never outlive the feed's hard deadline: the ingestion gateway
//! wraps each whole fetch in a timeout, and an expired deadline drops the
//! in-flight retry loop.
//!
//! # Usage
//!
//! ```ignore
//! use crate::retry;
//!
//! let body = retry::send_json(|| client.get(&url).query(&params), retry::DEFAULT_MAX_RETRIES).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Default number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s) the total wait before giving up
/// is 14 seconds.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// Returns [`SourceError::RateLimited`] if the upstream still answers 429
/// after `max_retries` attempts, and another [`SourceError`] if the request
/// fails after all retries, the server returns a non-retryable status, or
/// the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F, max_retries: u32) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        SourceError::Json(e)
    })
}

/// Core retry loop behind [`send_json`].
///
/// Returns the successful [`reqwest::Response`] (status 2xx or 3xx).
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < max_retries;
        attempt += 1;

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) && can_retry => {
                log::warn!("  transient error: {e}");
                continue;
            }
            Err(e) => return Err(SourceError::Http(e)),
        };

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if can_retry {
                log::warn!("  HTTP 429 (rate limited)");
                continue;
            }
            return Err(SourceError::RateLimited);
        }

        if status.is_server_error() {
            if can_retry {
                log::warn!("  HTTP {status} (server error)");
                continue;
            }
            return Err(SourceError::Normalization {
                message: format!("HTTP {status} after {max_retries} retries"),
            });
        }

        // 4xx other than 429 is permanent
        if status.is_client_error() {
            return Err(SourceError::Normalization {
                message: format!("HTTP {status}"),
            });
        }

        return Ok(response);
    }
}

/// Backoff before retry `attempt` (1-based): 2s, 4s, 8s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
