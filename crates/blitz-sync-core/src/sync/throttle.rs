//! Rate-limited HTTP plumbing
//!
//! Outbound request volume to the replay hosting service is the one
//! shared resource that needs protection. A fixed-rate limiter scoped to
//! a set of URL prefixes serializes effective throughput regardless of
//! caller concurrency; URLs outside the prefixes go out unthrottled.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::error::{Error, Result};

/// Fixed-rate request limiter.
///
/// Slots are spaced one interval apart; concurrent callers queue behind
/// each other. A non-positive rate disables throttling.
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `rate_limit` is in requests per second (20 per hour is `20.0 / 3600.0`).
    pub fn new(rate_limit: f64) -> Self {
        let interval = (rate_limit > 0.0).then(|| Duration::from_secs_f64(1.0 / rate_limit));
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next request slot is free.
    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *next_slot = Some(slot + interval);
            slot
        };
        sleep_until(slot).await;
    }
}

/// HTTP client with a shared outbound budget for a set of URL prefixes.
///
/// Every request whose URL starts with one of the configured prefixes
/// passes through the limiter first; all other requests are unthrottled.
pub struct ThrottledClient {
    client: reqwest::Client,
    limiter: RateLimiter,
    filters: Vec<String>,
}

impl ThrottledClient {
    /// Build a client throttling the given URL prefixes at `rate_limit`
    /// requests per second, optionally authenticating every request with
    /// an `Authorization: Token ...` header.
    pub fn new(rate_limit: f64, filters: Vec<String>, auth_token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Token {token}"))
                .map_err(|_| Error::validation("auth_token", "not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            limiter: RateLimiter::new(rate_limit),
            filters,
        })
    }

    fn is_limited(&self, url: &str) -> bool {
        self.filters.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }

    async fn admit(&self, url: &str) {
        if self.is_limited(url) {
            debug!("waiting for a request slot: {url}");
            self.limiter.acquire().await;
        }
    }

    /// GET, throttled when the URL matches a configured prefix
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.admit(url).await;
        Ok(self.client.get(url).send().await?)
    }

    /// Multipart POST, throttled when the URL matches a configured prefix
    pub async fn post_multipart(
        &self,
        url: reqwest::Url,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        self.admit(url.as_str()).await;
        Ok(self.client.post(url).multipart(form).send().await?)
    }
}
