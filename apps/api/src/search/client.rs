//! 104 job search API client.
//!
//! One GET per call, no retries: a failed search is surfaced to the caller
//! and retried only by re-invocation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::search::models::{SearchPayload, SearchQuery};

pub const DEFAULT_SEARCH_URL: &str = "https://www.104.com.tw/jobs/search/list";
const REFERER: &str = "https://www.104.com.tw/jobs/search/";
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("search API returned malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("搜尋失敗：{message}")]
    Upstream { message: String },
}

/// The job-board seam. `SearchClient` is the live implementation.
#[async_trait]
pub trait JobBoard: Send + Sync {
    async fn search(&self, query: &SearchQuery, page: u32) -> Result<SearchPayload, SearchError>;
}

#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
}

impl SearchClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .user_agent(DESKTOP_USER_AGENT)
            // idle connections are never handed to another request
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl JobBoard for SearchClient {
    async fn search(&self, query: &SearchQuery, page: u32) -> Result<SearchPayload, SearchError> {
        let params = query_pairs(query, page);
        debug!("104 search params: {:?}", params);

        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::REFERER, REFERER)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("104 search returned {}", status);
            return Err(SearchError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let payload: SearchPayload = serde_json::from_str(&body)?;
        if !payload.is_ok() {
            return Err(SearchError::Upstream {
                message: payload
                    .error_msg
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "未知錯誤".to_string()),
            });
        }

        info!(
            "104 search returned {} of {} jobs",
            payload.jobs().len(),
            payload.total_count()
        );
        Ok(payload)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Query string assembly
// ────────────────────────────────────────────────────────────────────────────

/// Builds the 104 query parameters. Absent selections are omitted entirely.
pub fn query_pairs(query: &SearchQuery, page: u32) -> Vec<(&'static str, String)> {
    let mut pairs: Vec<(&'static str, String)> = vec![("page", page.max(1).to_string())];

    if let Some(keyword) = &query.keyword {
        pairs.push(("keyword", keyword.clone()));
        if query.keyword_in_title_only {
            pairs.push(("kwop", "1".to_string()));
        }
    }
    if !query.areas.is_empty() {
        pairs.push(("area", query.areas.join(",")));
    }
    if !query.job_categories.is_empty() {
        pairs.push(("jobcat", query.job_categories.join(",")));
    }
    if let Some(min) = query.salary_min {
        pairs.push(("scmin", min.to_string()));
    }
    if let Some(max) = query.salary_max {
        pairs.push(("scmax", max.to_string()));
    }
    if let Some(mask) = bitmask_sum(&query.work_periods) {
        pairs.push(("s9", mask.to_string()));
    }
    if let Some(rotation) = &query.rotation {
        pairs.push(("s5", rotation.clone()));
    }
    if let Some(weekend_off) = query.weekend_off {
        pairs.push(("wktm", if weekend_off { "1" } else { "0" }.to_string()));
    }
    if let Some(days) = query.posted_within_days {
        pairs.push(("isnew", days.to_string()));
    }
    if let Some(experience) = &query.experience {
        pairs.push(("jobexp", experience.clone()));
    }
    if let Some(education) = &query.education {
        pairs.push(("edu", education.clone()));
    }
    if !query.company_types.is_empty() {
        pairs.push(("zone", query.company_types.join(",")));
    }
    if !query.welfare.is_empty() {
        pairs.push(("wf", query.welfare.join(",")));
    }
    if let Some(sort) = &query.sort {
        pairs.push(("order", sort.clone()));
        pairs.push(("asc", if query.sort_ascending { "1" } else { "0" }.to_string()));
    }

    pairs
}

/// Sums additive bitmask codes. Non-numeric codes are skipped.
fn bitmask_sum(codes: &[String]) -> Option<u32> {
    let sum = codes
        .iter()
        .filter_map(|code| match code.parse::<u32>() {
            Ok(bit) => Some(bit),
            Err(_) => {
                warn!("Ignoring non-numeric bitmask code '{code}'");
                None
            }
        })
        .sum::<u32>();
    (sum > 0).then_some(sum)
}
