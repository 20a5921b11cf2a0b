//! Rate-limited HTTP client for content pages
//!
//! This module provides the page fetcher used by the collector. Requests are
//! issued one at a time, separated by a randomized delay, and retried with
//! exponential backoff when the platform answers with an error, times out, or
//! serves a page that is obviously not fully rendered.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, VidlinkError};

/// Default User-Agent mimicking a modern browser
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

/// Default Accept header for HTML pages
const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Default Accept-Language header
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Randomized inter-request delay.
///
/// Every request except the first waits for a duration drawn uniformly from
/// `[min_delay, max_delay]`. Holding the lock across the sleep serializes
/// callers, so two requests can never start inside the same window.
pub struct RateLimiter {
    /// Lower bound of the delay window
    min_delay: Duration,
    /// Upper bound of the delay window
    max_delay: Duration,
    /// Whether a request has already gone out
    primed: Mutex<bool>,
}

impl RateLimiter {
    /// Create a new rate limiter for the given delay window.
    ///
    /// Bounds given in the wrong order are swapped.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use vidlink_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(Duration::from_secs(3), Duration::from_secs(7));
    /// assert_eq!(limiter.max_delay(), Duration::from_secs(7));
    /// ```
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            (max_delay, min_delay)
        };
        Self {
            min_delay,
            max_delay,
            primed: Mutex::new(false),
        }
    }

    /// Draw the next delay from the configured window.
    pub fn sample_delay(&self) -> Duration {
        if self.min_delay == self.max_delay {
            return self.min_delay;
        }
        let min_ms = self.min_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }

    /// Wait until the next request may be sent.
    ///
    /// Returns the delay that was actually slept (zero for the first request).
    pub async fn acquire(&self) -> Duration {
        let mut primed = self.primed.lock().await;

        let waited = if *primed {
            let delay = self.sample_delay();
            if !delay.is_zero() {
                debug!(delay_ms = delay.as_millis() as u64, "waiting before next request");
                sleep(delay).await;
            }
            delay
        } else {
            Duration::ZERO
        };

        *primed = true;
        waited
    }

    /// Get the lower bound of the delay window
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Get the upper bound of the delay window
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

/// Configuration for the page client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Lower bound of the randomized inter-request delay (default: 3s)
    pub min_delay: Duration,
    /// Upper bound of the randomized inter-request delay (default: 7s)
    pub max_delay: Duration,
    /// Per-request timeout (default: 120s)
    pub timeout: Duration,
    /// Total attempts per page, including the first (default: 3)
    pub max_retries: u32,
    /// Base of the exponential backoff added between attempts (default: 2s)
    pub backoff_base: Duration,
    /// Bodies shorter than this are treated as not loaded (default: 1000)
    pub min_body_len: usize,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Authentication cookies sent with every request
    pub cookies: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(7),
            timeout: Duration::from_secs(120),
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
            min_body_len: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookies: BTreeMap::new(),
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code (always 2xx)
    pub status: u16,
    /// Page body
    pub body: String,
}

/// HTTP client for content pages with rate limiting and retry logic
///
/// This client automatically:
/// - Spaces requests with a randomized delay
/// - Retries timeouts, connection errors, non-2xx answers and truncated pages
/// - Sends browser-like headers and the configured authentication cookies
pub struct PageClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Rate limiter for request throttling
    rate_limiter: RateLimiter,
    /// Total attempts per page
    max_retries: u32,
    /// Backoff base between attempts
    backoff_base: Duration,
    /// Minimum body length of a loaded page
    min_body_len: usize,
    /// Monotonic count of requests sent
    requests: AtomicU64,
}

impl PageClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// - `VidlinkError::Config` - a cookie or the User-Agent is not a valid header value
    /// - `VidlinkError::HttpError` - the HTTP client cannot be created
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(DEFAULT_ACCEPT),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );
        if let Some(cookie) = cookie_header(&config.cookies) {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| VidlinkError::Config(format!("invalid cookie value: {}", e)))?;
            headers.insert(reqwest::header::COOKIE, value);
        }

        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| VidlinkError::Config(format!("invalid user agent: {}", e)))?;
        headers.insert(reqwest::header::USER_AGENT, user_agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.min_delay, config.max_delay),
            max_retries: config.max_retries.max(1),
            backoff_base: config.backoff_base,
            min_body_len: config.min_body_len,
            requests: AtomicU64::new(0),
        })
    }

    /// Fetch a page, honoring the rate limit and retrying transient failures
    ///
    /// # Arguments
    /// * `url` - Absolute URL of the page
    ///
    /// # Errors
    /// - `VidlinkError::Network` - every attempt failed; carries the URL,
    ///   the attempt count and the last failure reason
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let mut last_reason = String::new();

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let backoff = self.calculate_backoff_delay(attempt - 1);
                if !backoff.is_zero() {
                    debug!(url, backoff_ms = backoff.as_millis() as u64, "backing off before retry");
                    sleep(backoff).await;
                }
            }

            self.rate_limiter.acquire().await;
            let request_no = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(
                url,
                attempt = attempt + 1,
                max_attempts = self.max_retries,
                request_no,
                "requesting page"
            );

            match self.try_fetch(url).await {
                Ok(page) => return Ok(page),
                Err(reason) => {
                    warn!(
                        url,
                        attempt = attempt + 1,
                        max_attempts = self.max_retries,
                        %reason,
                        "page request failed"
                    );
                    last_reason = reason;
                }
            }
        }

        Err(VidlinkError::Network {
            url: url.to_string(),
            attempts: self.max_retries,
            reason: last_reason,
        })
    }

    /// Single attempt; the error is a human-readable failure reason
    async fn try_fetch(&self, url: &str) -> std::result::Result<FetchedPage, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(describe_request_error)?;
        let status = response.status();

        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let body = response.text().await.map_err(describe_request_error)?;

        if body.len() < self.min_body_len {
            return Err(format!(
                "page content too short ({} bytes, expected at least {})",
                body.len(),
                self.min_body_len
            ));
        }

        Ok(FetchedPage {
            status: status.as_u16(),
            body,
        })
    }

    /// Calculate exponential backoff delay for retry
    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        // base, 2 * base, 4 * base, ...
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Number of requests sent so far, retries included
    pub fn requests_sent(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Get a reference to the rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

/// Build a `Cookie` header value from a cookie map.
fn cookie_header(cookies: &BTreeMap<String, String>) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

fn describe_request_error(error: reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection error: {}", error)
    } else {
        error.to_string()
    }
}
