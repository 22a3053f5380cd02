//! HTTP transport
//!
//! This module handles every outbound request of a run:
//! - Building the shared HTTP client (one connection pool per run)
//! - Two header profiles for servers that block the first fingerprint
//! - Per-host throttling of every GET
//! - Retry with exponential backoff for transient failures
//! - Classification of the final response into a `FetchOutcome`

use crate::config::{Tunables, DEFAULT_ACCEPT_LANGUAGE};
use crate::crawler::throttle::HostThrottle;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, LAST_MODIFIED,
    REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Status codes that are retried with backoff
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound on a single backoff sleep
pub const MAX_BACKOFF: Duration = Duration::from_secs(600);

const PRIMARY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

const SECONDARY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36 Edg/125.0.0.0";

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Request header fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderProfile {
    /// Desktop Chrome
    Primary,
    /// Desktop Edge with client hints, used after a 403
    Secondary,
}

impl HeaderProfile {
    /// Builds the request headers for this profile
    pub fn headers(&self, accept_language: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let language = HeaderValue::from_str(accept_language)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));

        headers.insert(ACCEPT_LANGUAGE, language);
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));

        match self {
            Self::Primary => {
                headers.insert(USER_AGENT, HeaderValue::from_static(PRIMARY_USER_AGENT));
            }
            Self::Secondary => {
                headers.insert(USER_AGENT, HeaderValue::from_static(SECONDARY_USER_AGENT));
                headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
                headers.insert(
                    HeaderName::from_static("sec-ch-ua"),
                    HeaderValue::from_static(
                        "\"Not/A)Brand\";v=\"8\", \"Chromium\";v=\"125\", \"Microsoft Edge\";v=\"125\"",
                    ),
                );
                headers.insert(
                    HeaderName::from_static("sec-ch-ua-platform"),
                    HeaderValue::from_static("\"Windows\""),
                );
                headers.insert(
                    HeaderName::from_static("sec-ch-ua-mobile"),
                    HeaderValue::from_static("?0"),
                );
            }
        }

        headers
    }
}

/// A successful (2xx) response, fully read
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Content-Type header value, empty if missing
    pub fn content_type(&self) -> &str {
        self.header(CONTENT_TYPE).unwrap_or("")
    }

    /// Raw Last-Modified header value
    pub fn last_modified(&self) -> Option<&str> {
        self.header(LAST_MODIFIED)
    }

    fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Result of a fetch including its retries
#[derive(Debug)]
pub enum FetchOutcome {
    /// A 2xx response
    Content(FetchedPage),

    /// Retry budget exhausted on network errors or retryable statuses
    TransientFailure {
        /// Description of the last failure
        reason: String,
    },

    /// A non-retryable, non-2xx status
    PermanentFailure {
        /// The HTTP status code
        status: u16,
    },
}

impl FetchOutcome {
    /// The page if this is a 200 response
    pub fn into_ok_page(self) -> Option<FetchedPage> {
        match self {
            Self::Content(page) if page.status == 200 => Some(page),
            _ => None,
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::Content(page) => format!("HTTP {}", page.status),
            Self::TransientFailure { reason } => format!("transient failure: {}", reason),
            Self::PermanentFailure { status } => format!("HTTP {}", status),
        }
    }
}

/// Retry budget and backoff base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Backoff base in seconds
    pub backoff_base: f64,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    ///
    /// `base * 2^(attempt-1) * (1 + 0.25 * (attempt + 1))` seconds: exponential
    /// growth with a linear jitter factor. With the default base of 0.8s the
    /// schedule is 1.2s, 2.8s, 6.4s. Delays are capped at [`MAX_BACKOFF`].
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.backoff_base <= 0.0 {
            return Duration::ZERO;
        }

        let attempt = attempt.clamp(1, 64);
        let growth = 2f64.powi(attempt as i32 - 1);
        let jitter = 1.0 + 0.25 * (attempt as f64 + 1.0);
        let secs = self.backoff_base * growth * jitter;

        Duration::try_from_secs_f64(secs).map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
    }

    /// Total number of attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }
}

/// Builds the shared HTTP client
///
/// Redirects are followed (up to 10 hops), compressed bodies are decoded and
/// every request is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for statuses that warrant a retry
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// HTTP transport shared by listing discovery and article extraction
pub struct Transport {
    client: Client,
    throttle: Arc<HostThrottle>,
    retry: RetryPolicy,
    accept_language: String,
}

impl Transport {
    /// Creates a transport with a fresh host throttle
    pub fn new(tunables: &Tunables) -> Result<Self, reqwest::Error> {
        let throttle = Arc::new(HostThrottle::new(tunables.per_host_concurrency));
        Self::with_throttle(tunables, throttle)
    }

    /// Creates a transport sharing an existing host throttle
    ///
    /// Lets a long-lived process keep per-host state across runs.
    pub fn with_throttle(
        tunables: &Tunables,
        throttle: Arc<HostThrottle>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(tunables.http_timeout)?,
            throttle,
            retry: RetryPolicy {
                retries: tunables.http_retries,
                backoff_base: tunables.http_backoff_base,
            },
            accept_language: tunables.accept_language.clone(),
        })
    }

    /// The host throttle every request passes through
    pub fn throttle(&self) -> &Arc<HostThrottle> {
        &self.throttle
    }

    /// Fetches a URL with throttling and retries
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Return `Content` |
    /// | HTTP 429, 500, 502, 503, 504 | Retry with backoff |
    /// | Network error or timeout | Retry with backoff |
    /// | Any other status | Return `PermanentFailure` |
    /// | Retries exhausted | Return `TransientFailure` |
    ///
    /// The host permit is held for the whole retry chain.
    pub async fn fetch(&self, url: &Url, profile: HeaderProfile) -> FetchOutcome {
        let _permit = match self.throttle.acquire(url).await {
            Ok(permit) => permit,
            Err(e) => {
                return FetchOutcome::TransientFailure {
                    reason: format!("host limiter closed: {}", e),
                }
            }
        };

        let mut last_reason = String::from("no attempt made");

        for attempt in 0..self.retry.max_attempts() {
            if attempt > 0 {
                let delay = self.retry.delay(attempt);
                tracing::debug!("Backing off {:?} before retry {} of {}", delay, attempt, url);
                tokio::time::sleep(delay).await;
            }

            tracing::debug!("GET {} ({:?}, attempt {})", url, profile, attempt + 1);

            let response = match self
                .client
                .get(url.clone())
                .headers(profile.headers(&self.accept_language))
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_reason = describe_error(&e);
                    tracing::warn!(
                        "GET failed {} ({}), retry {}/{}",
                        url,
                        last_reason,
                        attempt,
                        self.retry.retries
                    );
                    continue;
                }
            };

            let status = response.status();

            if is_retryable_status(status) {
                last_reason = format!("HTTP {}", status.as_u16());
                tracing::warn!(
                    "Transient {} on {}, retry {}/{}",
                    status.as_u16(),
                    url,
                    attempt,
                    self.retry.retries
                );
                continue;
            }

            if !status.is_success() {
                return FetchOutcome::PermanentFailure {
                    status: status.as_u16(),
                };
            }

            let final_url = response.url().clone();
            let headers = response.headers().clone();

            match response.bytes().await {
                Ok(body) => {
                    return FetchOutcome::Content(FetchedPage {
                        final_url,
                        status: status.as_u16(),
                        headers,
                        body: body.to_vec(),
                    })
                }
                Err(e) => {
                    last_reason = format!("body read failed: {}", describe_error(&e));
                    tracing::warn!(
                        "Reading body of {} failed ({}), retry {}/{}",
                        url,
                        last_reason,
                        attempt,
                        self.retry.retries
                    );
                }
            }
        }

        FetchOutcome::TransientFailure {
            reason: last_reason,
        }
    }
}

/// Classifies a reqwest error for logs
fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if e.is_redirect() {
        "redirect limit exceeded".to_string()
    } else {
        e.to_string()
    }
}
