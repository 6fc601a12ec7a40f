use std::cell::Cell;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::CrawlConfig;

/// Minimum-interval gate between page fetches. Sleeps off whatever remains
/// of the interval since the previous request, so politeness holds no
/// matter which component issues the next fetch.
struct RateGate {
    min_interval: Duration,
    last: Cell<Option<Instant>>,
}

impl RateGate {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Cell::new(None),
        }
    }

    async fn wait(&self) {
        if let Some(last) = self.last.get() {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last.set(Some(Instant::now()));
    }
}

/// Fetch counters for the end-of-run report.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchStats {
    pub pages_fetched: u64,
    pub fetch_errors: u64,
}

/// Rate-limited page fetcher. Network and status errors never cross this
/// boundary: callers get `None` and the error is logged.
pub struct PageFetcher {
    client: Client,
    gate: RateGate,
    pages_fetched: Cell<u64>,
    fetch_errors: Cell<u64>,
}

impl PageFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            gate: RateGate::new(config.fetch_delay),
            pages_fetched: Cell::new(0),
            fetch_errors: Cell::new(0),
        })
    }

    /// Fetch one page's body. No retries: a failed fetch forfeits that
    /// branch of the crawl for the run.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        self.gate.wait().await;
        debug!(url, "fetching page");

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return self.record_error(url, &e.to_string()),
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => return self.record_error(url, &e.to_string()),
        };
        match response.text().await {
            Ok(body) => {
                self.pages_fetched.set(self.pages_fetched.get() + 1);
                Some(body)
            }
            Err(e) => self.record_error(url, &e.to_string()),
        }
    }

    fn record_error(&self, url: &str, error: &str) -> Option<String> {
        self.fetch_errors.set(self.fetch_errors.get() + 1);
        warn!(url, error, "fetch failed");
        None
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            pages_fetched: self.pages_fetched.get(),
            fetch_errors: self.fetch_errors.get(),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn gate_enforces_minimum_interval() {
        let gate = RateGate::new(Duration::from_millis(500));
        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn gate_does_not_delay_first_request() {
        let gate = RateGate::new(Duration::from_millis(500));
        let start = Instant::now();
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn fetch_error_yields_none_and_counts() {
        let config = CrawlConfig {
            fetch_delay: Duration::ZERO,
            timeout: Duration::from_millis(200),
            ..CrawlConfig::default()
        };
        let fetcher = PageFetcher::new(&config).unwrap();
        // Nothing listens on this port.
        let body = fetcher.fetch("http://127.0.0.1:9/none/").await;
        assert!(body.is_none());
        assert_eq!(fetcher.stats().fetch_errors, 1);
        assert_eq!(fetcher.stats().pages_fetched, 0);
    }
}
