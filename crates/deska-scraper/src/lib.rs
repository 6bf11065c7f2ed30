//! Two-pass notice-board crawl: the listing page yields entries, every entry's
//! detail page yields its attachments.

use std::fmt;
use std::sync::Arc;

use deska_core::{DateParseError, Notices};
use deska_http::{FetchError, HttpClientConfig, HttpFetcher, PageSource};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

pub mod board;
pub mod parse;

pub use board::{NoticeBoard, Registration};
pub use parse::{parse_attachments, parse_listing};

pub const CRATE_NAME: &str = "deska-scraper";

pub const DEFAULT_BASE_URL: &str = "https://www.drasov.cz";
pub const DEFAULT_LISTING_PATH: &str = "/uredni-deska";
pub const DEFAULT_ALLOWED_DOMAINS: [&str; 2] = ["drasov.cz", "www.drasov.cz"];

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub listing_path: String,
    pub allowed_domains: Vec<String>,
    pub http: HttpClientConfig,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            http: HttpClientConfig::default(),
        }
    }
}

impl ScrapeConfig {
    pub fn base(&self) -> Result<Url, ScrapeError> {
        Url::parse(&self.base_url).map_err(|source| ScrapeError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    pub fn listing_url(&self) -> Result<Url, ScrapeError> {
        self.base()?
            .join(&self.listing_path)
            .map_err(|source| ScrapeError::InvalidUrl {
                url: self.listing_path.clone(),
                source,
            })
    }

    pub fn is_allowed(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.allowed_domains.iter().any(|d| d == host))
    }

    fn ensure_allowed(&self, url: &str) -> Result<(), ScrapeError> {
        let parsed = Url::parse(url).map_err(|source| ScrapeError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if self.is_allowed(&parsed) {
            Ok(())
        } else {
            Err(ScrapeError::ForbiddenDomain(url.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    Detail,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Listing => f.write_str("listing"),
            Stage::Detail => f.write_str("detail"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("fetching {stage} page {url}: {source}")]
    Fetch {
        stage: Stage,
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("refusing to visit {0}: domain not allowed")]
    ForbiddenDomain(String),
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("board item {item}: bad {field}: {source}")]
    Date {
        item: usize,
        field: &'static str,
        #[source]
        source: DateParseError,
    },
    #[error("board item {item}: expected {expected} date columns, found {found}", expected = parse::DATE_COLUMNS_PER_ITEM)]
    DateFieldCount { item: usize, found: usize },
    #[error("board item {item}: date column has no value")]
    MissingDateValue { item: usize },
    #[error("board item {item}: no detail link")]
    MissingDetailLink { item: usize },
    #[error("detail page {0} has no registered entry")]
    UnregisteredEntry(String),
    #[error("invalid selector {0}")]
    Selector(String),
    #[error("detail task failed: {0}")]
    Task(#[from] JoinError),
}

impl ScrapeError {
    pub fn stage(&self) -> Stage {
        match self {
            ScrapeError::Fetch { stage, .. } => *stage,
            ScrapeError::UnregisteredEntry(_) | ScrapeError::Task(_) => Stage::Detail,
            _ => Stage::Listing,
        }
    }
}

pub struct Scraper {
    config: ScrapeConfig,
    source: Arc<dyn PageSource>,
}

impl Scraper {
    /// Scraper that talks to the live site over HTTP.
    pub fn new(config: ScrapeConfig) -> anyhow::Result<Self> {
        let http = HttpFetcher::new(config.http.clone())?;
        Ok(Self::with_source(config, Arc::new(http)))
    }

    pub fn with_source(config: ScrapeConfig, source: Arc<dyn PageSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Runs both passes and returns every entry in listing order. The first
    /// failure anywhere aborts the run and cancels pending detail fetches.
    pub async fn run(&self) -> Result<Notices, ScrapeError> {
        let run_id = Uuid::new_v4();
        let board = Arc::new(NoticeBoard::new());

        let base = self.config.base()?;
        let listing_url = self.config.listing_url()?.to_string();
        self.config.ensure_allowed(&listing_url)?;

        info!(%run_id, url = %listing_url, "visiting");
        let html = self
            .source
            .fetch_page(run_id, &listing_url)
            .await
            .map_err(|source| ScrapeError::Fetch {
                stage: Stage::Listing,
                url: listing_url.clone(),
                source,
            })?;
        let entries = parse_listing(&html, &base)?;

        let mut details = JoinSet::new();
        for entry in entries {
            let entry_url = entry.entry_url.clone();
            if board.register(entry).await == Registration::Replaced {
                debug!(%run_id, url = %entry_url, "duplicate board item, keeping last");
                continue;
            }
            self.config.ensure_allowed(&entry_url)?;
            details.spawn(fetch_detail(
                Arc::clone(&self.source),
                Arc::clone(&board),
                run_id,
                entry_url,
            ));
        }

        while let Some(joined) = details.join_next().await {
            joined??;
        }

        let notices = board.snapshot().await;
        info!(%run_id, entries = notices.len(), "scrape finished");
        Ok(notices)
    }
}

async fn fetch_detail(
    source: Arc<dyn PageSource>,
    board: Arc<NoticeBoard>,
    run_id: Uuid,
    entry_url: String,
) -> Result<(), ScrapeError> {
    info!(%run_id, url = %entry_url, "visiting");
    let html = source
        .fetch_page(run_id, &entry_url)
        .await
        .map_err(|source| ScrapeError::Fetch {
            stage: Stage::Detail,
            url: entry_url.clone(),
            source,
        })?;
    let attachments = parse_attachments(&html)?;
    debug!(%run_id, url = %entry_url, attachments = attachments.len(), "detail parsed");
    board.append_attachments(&entry_url, attachments).await
}
