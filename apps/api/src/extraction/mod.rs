//! Content extraction engine: URL → bounded, LLM-ready page content.
//!
//! validate → pick strategy → fetch (static HTTP or headless browser) →
//! reduce. Every failure is terminal for that URL only; callers log it and
//! carry on with the bare query.

pub mod browser;
pub mod html;
pub mod job_page;
pub mod sections;
pub mod static_fetch;
pub mod text;
pub mod url_guard;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::extraction::sections::Section;
use crate::extraction::text::truncate_with_ellipsis;
use crate::extraction::url_guard::{host_matches, validate_url, UrlRejection};

/// Hard ceiling on anything handed to the LLM as page context.
pub const MAX_RENDERED_CHARS: usize = 3000;
/// Per-section ceiling inside a structured rendering.
pub const MAX_SECTION_CHARS: usize = 600;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ExtractedContent {
    /// Flat `label：value` lines or a page-text dump.
    Summary(String),
    /// Named sections of a job-board posting.
    Sections(Vec<Section>),
}

impl ExtractedContent {
    /// Text form, never longer than [`MAX_RENDERED_CHARS`] plus an ellipsis.
    pub fn render(&self) -> String {
        let text = match self {
            ExtractedContent::Summary(text) => text.clone(),
            ExtractedContent::Sections(sections) => sections
                .iter()
                .map(|s| s.render(MAX_SECTION_CHARS))
                .collect::<Vec<_>>()
                .join("\n\n"),
        };
        truncate_with_ellipsis(&text, MAX_RENDERED_CHARS)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("URL rejected: {0}")]
    Rejected(#[from] UrlRejection),

    #[error("page request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("page returned HTTP {0}")]
    Status(u16),

    #[error("page body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("page fetch timed out after {0}s")]
    Timeout(u64),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("page had no extractable content")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Static,
    Dynamic,
}

/// One way of turning a validated URL into content.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<ExtractedContent, FetchError>;
}

// ────────────────────────────────────────────────────────────────────────────
// ContentExtractor
// ────────────────────────────────────────────────────────────────────────────

pub struct ContentExtractor {
    static_fetcher: Arc<dyn PageFetcher>,
    dynamic_fetcher: Arc<dyn PageFetcher>,
    dynamic_domains: Vec<String>,
}

impl ContentExtractor {
    pub fn new(
        static_fetcher: Arc<dyn PageFetcher>,
        dynamic_fetcher: Arc<dyn PageFetcher>,
        dynamic_domains: Vec<String>,
    ) -> Self {
        Self {
            static_fetcher,
            dynamic_fetcher,
            dynamic_domains,
        }
    }

    /// Dynamic for hosts on the JavaScript-rendered allow-list, static otherwise.
    pub fn strategy_for(&self, url: &Url) -> Strategy {
        if self.dynamic_domains.iter().any(|d| host_matches(url, d)) {
            Strategy::Dynamic
        } else {
            Strategy::Static
        }
    }

    /// Full pipeline. Rejections are logged here; fetch failures are left to
    /// the caller.
    pub async fn try_extract(&self, raw_url: &str) -> Result<ExtractedContent, FetchError> {
        let url = validate_url(raw_url).inspect_err(|reason| {
            warn!("URL rejected: {} ({})", raw_url, reason);
        })?;
        let strategy = self.strategy_for(&url);
        info!("Extracting {} via {:?} fetch", url, strategy);

        let content = match strategy {
            Strategy::Static => self.static_fetcher.fetch(&url).await?,
            Strategy::Dynamic => self.dynamic_fetcher.fetch(&url).await?,
        };

        info!("Extracted {} chars from {}", content.render().chars().count(), url);
        Ok(content)
    }
}
