//! Document retrieval with bounded retry, exponential backoff, and
//! archival-snapshot fallback.
//!
//! Retry strategy:
//! - Timeout / connection error → retry (the two are indistinguishable here
//!   and are treated identically).
//! - HTTP 403, 404, 410 → the permanent-looking class; retried like any
//!   other failure.
//! - Any other non-2xx status → retried.
//! - Delay before attempt n+1 is `base_delay * 2^n` plus random jitter.
//!
//! When all direct attempts are spent, exactly one request goes to the
//! archival-snapshot service at `archive_base_url + url`; only a 200 counts
//! as success, anything else is [`FetchError::PermanentlyUnavailable`].

use chrono::Utc;
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::models::{FetchResult, RetrievalMethod};
use crate::store::{url_extension, ArtifactStore};

/// HTTP statuses that will not get better on their own.
const PERMANENT_STATUSES: [u16; 3] = [403, 404, 410];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transient { url: String, reason: String },
    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: u16 },
    #[error("{url} permanently unavailable (direct attempts and archive fallback failed)")]
    PermanentlyUnavailable { url: String },
    #[error("storage failed for {url}: {source}")]
    Storage {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
    store: ArtifactStore,
}

impl Fetcher {
    pub fn new(config: FetchConfig, store: ArtifactStore) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            config,
            store,
        })
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fetch a document and persist it content-addressed.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let mut last_status: Option<u16> = None;

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_delay(attempt - 1)).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return self.persist(url, response, RetrievalMethod::Direct).await;
                    }
                    last_status = Some(status.as_u16());
                    if PERMANENT_STATUSES.contains(&status.as_u16()) {
                        warn!(url, status = status.as_u16(), attempt, "permanent-looking status");
                    } else {
                        warn!(url, status = status.as_u16(), attempt, "unexpected status");
                    }
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "request failed");
                }
            }
        }

        if let Some(status) = last_status {
            info!(url, status, "direct attempts exhausted, trying archive snapshot");
        } else {
            info!(url, "direct attempts exhausted, trying archive snapshot");
        }
        self.fetch_archive(url).await
    }

    /// Retrieve listing-page text (sitemap or index) with the same retry
    /// policy, but no archive fallback and no persistence.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let mut last_reason = String::new();

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_delay(attempt - 1)).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(|e| FetchError::Transient {
                            url: url.to_string(),
                            reason: e.to_string(),
                        });
                    }
                    last_reason = format!("HTTP {}", status.as_u16());
                    warn!(url, status = status.as_u16(), attempt, "listing fetch failed");
                }
                Err(e) => {
                    last_reason = e.to_string();
                    warn!(url, attempt, error = %e, "listing fetch failed");
                }
            }
        }

        Err(FetchError::Transient {
            url: url.to_string(),
            reason: last_reason,
        })
    }

    /// The single archival-snapshot attempt. Fixed convention: the request
    /// target is the archive base URL with the original URL appended.
    async fn fetch_archive(&self, url: &str) -> Result<FetchResult, FetchError> {
        let archive_url = format!("{}{}", self.config.archive_base_url, url);

        match self.client.get(&archive_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                info!(url, "recovered from archive snapshot");
                self.persist(url, response, RetrievalMethod::Archive).await
            }
            Ok(response) => {
                warn!(url, status = response.status().as_u16(), "archive snapshot miss");
                Err(FetchError::PermanentlyUnavailable {
                    url: url.to_string(),
                })
            }
            Err(e) => {
                warn!(url, error = %e, "archive snapshot request failed");
                Err(FetchError::PermanentlyUnavailable {
                    url: url.to_string(),
                })
            }
        }
    }

    /// Hash the body, persist it content-addressed (skipping known content),
    /// and describe the outcome.
    async fn persist(
        &self,
        url: &str,
        response: reqwest::Response,
        method: RetrievalMethod,
    ) -> Result<FetchResult, FetchError> {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = response.bytes().await.map_err(|e| FetchError::Transient {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let hash = ArtifactStore::content_hash(&bytes);
        let extension = url_extension(url);

        let (artifact, written) =
            self.store
                .put(&hash, &extension, &bytes)
                .map_err(|e| FetchError::Storage {
                    url: url.to_string(),
                    source: e,
                })?;
        if written {
            info!(url, artifact = %artifact.display(), "stored new artifact");
        } else {
            info!(url, artifact = %artifact.display(), "content already stored, skipping write");
        }

        let source_domain = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();

        Ok(FetchResult {
            url: url.to_string(),
            content_hash: hash,
            size: bytes.len() as u64,
            content_type,
            source_domain,
            fetched_at: Utc::now(),
            method,
            artifact,
        })
    }

    /// `base_delay * 2^n` plus jitter of up to half the base delay.
    fn backoff_delay(&self, exponent: u32) -> Duration {
        let base = self.config.base_delay_ms.saturating_mul(1u64 << exponent.min(16));
        let jitter = if self.config.base_delay_ms > 1 {
            rand::rng().random_range(0..self.config.base_delay_ms / 2)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher_with(base_delay_ms: u64) -> Fetcher {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        let config = FetchConfig {
            base_delay_ms,
            ..FetchConfig::default()
        };
        // tempdir dropped here; these tests only exercise delay math.
        Fetcher::new(config, store).unwrap()
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let fetcher = fetcher_with(100);
        let d0 = fetcher.backoff_delay(0).as_millis() as u64;
        let d1 = fetcher.backoff_delay(1).as_millis() as u64;
        let d2 = fetcher.backoff_delay(2).as_millis() as u64;
        assert!((100..150).contains(&d0));
        assert!((200..250).contains(&d1));
        assert!((400..450).contains(&d2));
    }

    #[test]
    fn backoff_with_unit_base_has_no_jitter() {
        let fetcher = fetcher_with(1);
        assert_eq!(fetcher.backoff_delay(0), Duration::from_millis(1));
    }
}
