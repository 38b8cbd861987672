use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{error, warn};

use crate::error::Result;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

enum Attempt {
    Fetched(String),
    Retryable(String),
    Failed(String),
}

/// Downloads pages. Failures are logged and reported as `None`, never raised.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    backoff: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(format!("link-enricher/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Fetcher {
            client,
            max_retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn fetch(&self, url: &str) -> Option<String> {
        let mut retries = 0;
        loop {
            match self.attempt(url).await {
                Attempt::Fetched(html) => return Some(html),
                Attempt::Failed(reason) => {
                    warn!("{} for URL: {}", reason, url);
                    return None;
                }
                Attempt::Retryable(reason) if retries < self.max_retries => {
                    let wait = self.retry_wait(retries);
                    retries += 1;
                    warn!(
                        "{} for URL: {} (retry {}/{} in {:?})",
                        reason, url, retries, self.max_retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Attempt::Retryable(reason) => {
                    error!("Error fetching {}: {}", url, reason);
                    return None;
                }
            }
        }
    }

    // Doubles per retry, capped at MAX_BACKOFF
    fn retry_wait(&self, retries: u32) -> Duration {
        2u32.checked_pow(retries)
            .and_then(|factor| self.backoff.checked_mul(factor))
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Attempt::Failed(format!("Invalid request: {}", e)),
            Err(e) => return Attempt::Retryable(e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            let reason = format!("HTTP {}", status.as_u16());
            return if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Attempt::Retryable(reason)
            } else {
                Attempt::Failed(reason)
            };
        }

        match response.text().await {
            Ok(html) => Attempt::Fetched(html),
            Err(e) => Attempt::Retryable(e.to_string()),
        }
    }
}
