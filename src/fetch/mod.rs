//! HTTP Fetcher (C1, §4.1).
//!
//! Fetches rendered pages through a headless browser rather than a plain HTTP client,
//! since the source site hides several tables inside HTML comments that only materialize
//! after the page's own script runs (see `crate::parse`). A single `Fetcher` owns one
//! browser session for the duration of a batch and rate-gates every navigation through
//! it, so a whole scheduler run never exceeds one request per configured interval
//! regardless of how many players it touches.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::EngineError;

/// Rate gate shared across every fetch issued through a `Fetcher` (§4.1 "Rate-gated").
struct RateGate {
    interval: Duration,
    last_fetch: Mutex<Option<Instant>>,
}

impl RateGate {
    fn new(interval: Duration) -> Self {
        RateGate { interval, last_fetch: Mutex::new(None) }
    }

    async fn wait_turn(&self) {
        let mut last = self.last_fetch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Fetches rendered HTML through a pooled headless browser, retrying transient failures
/// with exponential backoff and gating every request through a shared rate limiter.
pub struct Fetcher {
    browser: Browser,
    rate_gate: Arc<RateGate>,
    max_retries: u32,
    timeout: Duration,
}

impl Fetcher {
    /// Launches one browser session for the caller to reuse across a whole batch
    /// (§4.1 "one browser session per fetch batch").
    pub async fn launch(rate_limit: Duration, max_retries: u32, timeout: Duration) -> Result<Self, EngineError> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::fetch_permanent("<browser launch>", e.into()))?;

        // chromiumoxide requires the handler event stream to be polled continuously for
        // the browser connection to make progress.
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Fetcher {
            browser,
            rate_gate: Arc::new(RateGate::new(rate_limit)),
            max_retries,
            timeout,
        })
    }

    /// Navigates to `url` and returns the fully rendered page HTML, rate-gated and
    /// retried on transient failure (§4.1 "retries with backoff on transient failure").
    pub async fn fetch_page(&self, url: &str) -> Result<String, EngineError> {
        let mut attempt = 0;
        loop {
            self.rate_gate.wait_turn().await;

            match self.try_fetch_once(url).await {
                Ok(html) => return Ok(html),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt + 1));
                    tracing::warn!(url, attempt, backoff_secs = backoff.as_secs(), "transient fetch failure, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_fetch_once(&self, url: &str) -> Result<String, EngineError> {
        let page = tokio::time::timeout(self.timeout, self.browser.new_page(url))
            .await
            .map_err(|_| EngineError::fetch_transient(url, anyhow::anyhow!("navigation timed out")))?
            .map_err(|e| classify_navigation_error(url, e.into()))?;

        let html = tokio::time::timeout(self.timeout, page.content())
            .await
            .map_err(|_| EngineError::fetch_transient(url, anyhow::anyhow!("content read timed out")))?
            .map_err(|e| EngineError::fetch_transient(url, e.into()))?;

        let _ = page.close().await;
        Ok(html)
    }

    pub async fn shutdown(mut self) {
        let _ = self.browser.close().await;
    }
}

/// A 404/410-style permanent failure (player page genuinely gone) shouldn't burn retries;
/// everything else (timeouts, connection resets, 5xx) is presumed transient.
fn classify_navigation_error(url: &str, source: anyhow::Error) -> EngineError {
    let message = source.to_string().to_lowercase();
    if message.contains("404") || message.contains("not found") {
        EngineError::fetch_permanent(url, source)
    } else {
        EngineError::fetch_transient(url, source)
    }
}
