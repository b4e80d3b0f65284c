//! HTTP retry helpers for transient Overpass errors.
//!
//! Every Overpass request goes through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so busy-server responses
//! (HTTP 429 and 504 are routine on the public instances), timeouts and
//! connection resets are retried with exponential backoff.

use std::time::Duration;

use crate::OsmError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// Retries connection errors, timeouts, HTTP 429 and HTTP 5xx. Other 4xx
/// statuses are permanent (usually a malformed query) and fail at once.
///
/// # Errors
///
/// Returns [`OsmError`] if the request still fails after all retries, the
/// server returns a non-retryable status, or the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    policy: RetryPolicy,
) -> Result<serde_json::Value, OsmError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<OsmError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) => {
                log::warn!("  transient error: {e}");
                last_error = Some(OsmError::Http(e));
                continue;
            }
            Err(e) => return Err(OsmError::Http(e)),
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            log::warn!("  HTTP {status} (server busy)");
            last_error = Some(OsmError::Status {
                status: status.as_u16(),
                message: format!("HTTP {status} after {} retries", policy.max_retries),
            });
            continue;
        }

        let url = response.url().to_string();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("  body read failed for {url}: {e}");
                last_error = Some(OsmError::Http(e));
                continue;
            }
        };

        if status.is_client_error() {
            return Err(OsmError::Status {
                status: status.as_u16(),
                message: preview(&text),
            });
        }

        return serde_json::from_str(&text).map_err(|e| {
            log::error!(
                "JSON parse failed.\n  url: {url}\n  status: {status}\n  \
                 received: {} bytes\n  parse error: {e}\n  body preview: {}",
                text.len(),
                preview(&text),
            );
            OsmError::Json(e)
        });
    }

    Err(last_error.unwrap_or_else(|| OsmError::Remote {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

/// Truncates a response body for logging.
fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
