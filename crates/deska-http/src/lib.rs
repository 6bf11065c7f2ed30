//! HTTP page fetching for the notice-board scraper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "deska-http";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    /// Upper bound on requests in flight at once.
    pub max_in_flight: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: Some(format!("deska/{}", env!("CARGO_PKG_VERSION"))),
            max_in_flight: 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("no page available for {0}")]
    NotFound(String),
}

/// Anything that can hand back the HTML body of a page by URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, run_id: Uuid, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: String,
}

#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    in_flight: Arc<Semaphore>,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;

        Ok(Self {
            client,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
        })
    }

    pub async fn fetch(&self, run_id: Uuid, url: &str) -> Result<FetchedResponse, FetchError> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .expect("semaphore not closed");

        let span = info_span!("http_fetch", %run_id, url);
        async {
            let resp = self.client.get(url).send().await?;
            let status = resp.status();
            let final_url = resp.url().to_string();

            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: final_url,
                });
            }

            let body = resp.text().await?;
            tracing::debug!(bytes = body.len(), "page fetched");
            Ok(FetchedResponse {
                status,
                final_url,
                body,
            })
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_page(&self, run_id: Uuid, url: &str) -> Result<String, FetchError> {
        Ok(self.fetch(run_id, url).await?.body)
    }
}

/// In-memory pages keyed by absolute URL, for offline runs.
#[derive(Debug, Clone, Default)]
pub struct FixturePages {
    pages: HashMap<String, String>,
}

impl FixturePages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.insert(url, html);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }
}

#[async_trait]
impl PageSource for FixturePages {
    async fn fetch_page(&self, _run_id: Uuid, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
