//! HTTP request executor with retry, backoff and rate-limit handling.
//!
//! API Best Practices (per OpenAlex docs):
//! - Use `mailto:email` parameter for polite pool (10 req/s vs 1 req/s)
//! - Honour `Retry-After` on HTTP 429
//! - Implement exponential backoff for retries
//!
//! Every wait goes through [`Pacing`], so tests can swap in a sleeper that
//! records durations instead of blocking.

use crate::error::{OpenAlexError, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Request timeout for a single GET
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries after the first attempt (three attempts in total)
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Wait applied when a 429 response carries no `Retry-After` header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Polite delay between successive pages of one query
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Query parameters of one request, in emission order
pub type Params = Vec<(String, String)>;

/// Async sleep function used for every suspension point
pub type Sleeper = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Sleep policy shared by the executor (retries) and the pagination driver
/// (inter-page delay).
#[derive(Clone)]
pub struct Pacing {
    /// Delay inserted before every page after the first
    pub page_delay: Duration,
    sleeper: Sleeper,
}

impl Pacing {
    /// Pacing backed by `tokio::time::sleep`
    pub fn new(page_delay: Duration) -> Self {
        Self::with_sleeper(page_delay, Arc::new(|d| tokio::time::sleep(d).boxed()))
    }

    /// Pacing with a custom sleeper
    pub fn with_sleeper(page_delay: Duration, sleeper: Sleeper) -> Self {
        Self { page_delay, sleeper }
    }

    /// Pacing that never waits and records every requested duration.
    ///
    /// Returns the pacing and the shared log of requested sleeps.
    pub fn recording(page_delay: Duration) -> (Self, Arc<Mutex<Vec<Duration>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let sleeper: Sleeper = Arc::new(move |d| {
            if let Ok(mut entries) = sink.lock() {
                entries.push(d);
            }
            futures::future::ready(()).boxed()
        });
        (Self::with_sleeper(page_delay, sleeper), log)
    }

    /// Suspend for `duration`
    pub async fn sleep(&self, duration: Duration) {
        (self.sleeper)(duration).await;
    }

    /// Suspend for the configured inter-page delay
    pub async fn between_pages(&self) {
        if !self.page_delay.is_zero() {
            self.sleep(self.page_delay).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_DELAY)
    }
}

impl fmt::Debug for Pacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pacing")
            .field("page_delay", &self.page_delay)
            .finish()
    }
}

/// Why a single attempt failed
enum Failure {
    RateLimited(u64),
    Transient(String),
}

/// Performs JSON GET requests with bounded retries.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    pacing: Pacing,
    max_retries: u32,
}

impl HttpExecutor {
    /// Create a new executor
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User-Agent header sent with every request
    /// * `max_retries` - Retries after the first attempt
    /// * `pacing` - Sleep policy for backoff waits
    pub fn new(user_agent: &str, max_retries: u32, pacing: Pacing) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| OpenAlexError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            pacing,
            max_retries,
        })
    }

    /// Sleep policy used by this executor
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// GET `url` with `params` using the configured retry ceiling
    pub async fn execute(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        self.execute_with_retries(url, params, self.max_retries).await
    }

    /// GET `url` with `params`, retrying up to `max_retries` times.
    ///
    /// HTTP 429 waits for `Retry-After` (default 60s); any other failure waits
    /// `2^attempt` seconds. Once retries are exhausted the last failure is
    /// returned as [`OpenAlexError::RateLimited`] or [`OpenAlexError::Api`].
    pub async fn execute_with_retries(
        &self,
        url: &str,
        params: &[(String, String)],
        max_retries: u32,
    ) -> Result<Value> {
        let request_url = Url::parse_with_params(url, params)
            .map_err(|e| OpenAlexError::Validation(format!("Invalid request URL {}: {}", url, e)))?;

        let mut attempt: u32 = 0;
        loop {
            debug!(url = %request_url, attempt, "GET");

            match self.attempt(request_url.clone()).await {
                Ok(body) => return Ok(body),
                Err(Failure::RateLimited(wait_secs)) => {
                    if attempt >= max_retries {
                        return Err(OpenAlexError::RateLimited { wait_secs });
                    }
                    warn!(attempt, wait_secs, "Rate limited, waiting before retry");
                    self.pacing.sleep(Duration::from_secs(wait_secs)).await;
                }
                Err(Failure::Transient(cause)) => {
                    if attempt >= max_retries {
                        return Err(OpenAlexError::Api(cause));
                    }
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt));
                    warn!(
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        error = %cause,
                        "Request failed, backing off"
                    );
                    self.pacing.sleep(backoff).await;
                }
            }

            attempt += 1;
        }
    }

    async fn attempt(&self, url: Url) -> std::result::Result<Value, Failure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Failure::Transient(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(Failure::RateLimited(wait));
        }

        if !status.is_success() {
            return Err(Failure::Transient(format!("HTTP {}", status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Failure::Transient(format!("Invalid JSON body: {}", e)))
    }
}
