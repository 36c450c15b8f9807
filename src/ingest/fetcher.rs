// src/ingest/fetcher.rs
//! HTTP access for source adapters and the detail enricher.
//!
//! No retries: a failed request is reported to the caller, which decides
//! whether the source or record is skipped.

use std::time::Duration;

use async_trait::async_trait;
use rand::prelude::IndexedRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;

use crate::error::FetchError;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub timeout: Duration,
    /// Delay after every request; `0` disables it.
    pub sleep_seconds: f64,
    pub rotate_user_agents: bool,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            sleep_seconds: 0.0,
            rotate_user_agents: true,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    settings: FetcherSettings,
}

impl HttpFetcher {
    pub fn new(settings: FetcherSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|source| FetchError::Request {
                url: String::new(),
                source,
            })?;

        Ok(Self { client, settings })
    }

    fn user_agent(&self) -> &'static str {
        if self.settings.rotate_user_agents {
            USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
        } else {
            USER_AGENTS[0]
        }
    }

    async fn pause(&self) {
        if self.settings.sleep_seconds <= 0.0 {
            return;
        }
        let jitter: f64 = rand::rng().random_range(-0.5..=0.5);
        let secs = (self.settings.sleep_seconds + jitter).max(0.1);
        // inf from config: skip the pause rather than panic
        if let Ok(d) = Duration::try_from_secs_f64(secs) {
            tokio::time::sleep(d).await;
        }
    }

    async fn finish(&self, url: &str, res: reqwest::Result<reqwest::Response>) -> Result<String, FetchError> {
        let result = match res {
            Ok(resp) => {
                let status = resp.status();
                if !status.is_success() {
                    Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    })
                } else {
                    resp.text().await.map_err(|source| FetchError::Request {
                        url: url.to_string(),
                        source,
                    })
                }
            }
            Err(source) => Err(FetchError::Request {
                url: url.to_string(),
                source,
            }),
        };

        if let Err(e) = &result {
            tracing::warn!(target: "fetch", %url, error = %e, "fetch failed");
        } else {
            tracing::debug!(target: "fetch", %url, "fetched");
        }

        self.pause().await;
        result
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let res = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent())
            .send()
            .await;
        self.finish(url, res).await
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, FetchError> {
        let res = self
            .client
            .post(url)
            .header(USER_AGENT, self.user_agent())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await;
        self.finish(url, res).await
    }
}
