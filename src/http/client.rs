//! Retrying HTTP client.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::time::Duration;

use super::retry::{MAX_ATTEMPTS, NonRetryableError, check_retryable};

pub const USER_AGENT: &str = concat!("ccupdater/", env!("CCUPDATER_VERSION"));

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    /// Build a client with the crate's user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// GET a JSON document.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        self.with_retry(url, || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))?
                .error_for_status()
                .map_err(check_retryable)?;
            response
                .json::<T>()
                .await
                .with_context(|| format!("Failed to parse JSON from {}", url))
        })
        .await
    }

    /// Stream the body of `url` into a writer created fresh for every attempt.
    /// Returns the number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        debug!("Downloading {}", url);
        self.with_retry(url, || self.download_once(url, &create_writer))
            .await
    }

    async fn download_once<W, F>(&self, url: &str, create_writer: &F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to start download of {}", url))?
            .error_for_status()
            .map_err(check_retryable)?;

        let mut writer = create_writer()?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write downloaded data")?;
            written += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded data")?;

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }

    async fn with_retry<F, Fut, T>(&self, url: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.downcast_ref::<NonRetryableError>().is_some() => return Err(e),
                Err(e) if attempt >= MAX_ATTEMPTS => {
                    return Err(e.context(format!("Giving up on {} after {} attempts", url, attempt)));
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} for {} failed ({:#}), retrying...",
                        attempt, MAX_ATTEMPTS, url, e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
