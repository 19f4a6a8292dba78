//! Search data models: the resolved query, the raw 104 payload, and the
//! display-ready `JobRecord` derived from it.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::search::facets::{Facet, FacetTables};

/// 104 marks an open-ended salary ("X and above") with this upper bound.
pub const SALARY_CEILING: u64 = 9_999_999;

/// Descriptions are cut to this many characters in formatted output.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

// ────────────────────────────────────────────────────────────────────────────
// SearchQuery
// ────────────────────────────────────────────────────────────────────────────

/// Code-mapped parameter set handed to the search client.
///
/// Multi-valued facets are ordered sets: insertion order is kept and
/// duplicates are ignored. Empty selections are never sent upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub keyword_in_title_only: bool,
    pub areas: Vec<String>,
    pub job_categories: Vec<String>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
    /// Bitmask facet, summed into a single value when sent.
    pub work_periods: Vec<String>,
    pub rotation: Option<String>,
    pub weekend_off: Option<bool>,
    pub posted_within_days: Option<u32>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub company_types: Vec<String>,
    pub welfare: Vec<String>,
    pub sort: Option<String>,
    pub sort_ascending: bool,
}

impl SearchQuery {
    /// True when nothing narrows the search, i.e. "search everything".
    pub fn is_unfiltered(&self) -> bool {
        self.keyword.is_none()
            && self.areas.is_empty()
            && self.job_categories.is_empty()
            && self.salary_min.is_none()
            && self.salary_max.is_none()
            && self.work_periods.is_empty()
            && self.rotation.is_none()
            && self.weekend_off.is_none()
            && self.posted_within_days.is_none()
            && self.experience.is_none()
            && self.education.is_none()
            && self.company_types.is_empty()
            && self.welfare.is_empty()
    }
}

/// Pushes `code` unless it is already present.
pub fn push_unique(set: &mut Vec<String>, code: &str) {
    if !set.iter().any(|c| c == code) {
        set.push(code.to_string());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Raw provider payload
// ────────────────────────────────────────────────────────────────────────────

/// Response body of `GET /jobs/search/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPayload {
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<i64>,
    #[serde(default)]
    pub data: Option<SearchData>,
    #[serde(rename = "errorMsg", default)]
    pub error_msg: Option<String>,
}

impl SearchPayload {
    pub fn is_ok(&self) -> bool {
        self.status.map_or(true, |s| s == 200)
    }

    pub fn jobs(&self) -> &[RawJob] {
        self.data.as_ref().map_or(&[], |d| d.list.as_slice())
    }

    pub fn total_count(&self) -> u64 {
        self.data.as_ref().map_or(0, |d| d.total_count)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub list: Vec<RawJob>,
    #[serde(rename = "totalCount", default, deserialize_with = "lenient_u64")]
    pub total_count: u64,
}

/// One job as 104 returns it. Numeric fields arrive as either numbers or
/// strings depending on the endpoint revision, so every field is lenient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJob {
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cust_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_addr_no_desc: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub salary_low: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub salary_high: u64,
    #[serde(default, deserialize_with = "lenient_codes")]
    pub option_edu: Vec<String>,
    /// Required experience in years; 0 means no requirement.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub period: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub appear_date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default)]
    pub link: Option<RawJobLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawJobLink {
    #[serde(default, deserialize_with = "lenient_string")]
    pub job: String,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Absent or unreadable statuses count as unknown, not as failure.
fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_codes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(v @ Value::Number(_)) => scalar(&v).into_iter().collect(),
        _ => Vec::new(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Salary descriptor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SalaryDescriptor {
    Range { low: u64, high: u64 },
    AtLeast { low: u64 },
    Negotiable,
}

impl SalaryDescriptor {
    pub fn from_bounds(low: u64, high: u64) -> Self {
        match (low, high) {
            (0, 0) => SalaryDescriptor::Negotiable,
            (low, high) if high >= SALARY_CEILING || high == 0 => {
                SalaryDescriptor::AtLeast { low }
            }
            (low, high) => SalaryDescriptor::Range { low, high },
        }
    }
}

impl fmt::Display for SalaryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SalaryDescriptor::Range { low, high } => write!(f, "{low} - {high} 元"),
            SalaryDescriptor::AtLeast { low } => write!(f, "{low} 元以上"),
            SalaryDescriptor::Negotiable => f.write_str("待遇面議"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JobRecord
// ────────────────────────────────────────────────────────────────────────────

/// Display-ready view of one search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: SalaryDescriptor,
    pub education: String,
    /// `None` when the posting has no experience requirement.
    pub experience_years: Option<u64>,
    pub posted: String,
    pub link: String,
    pub description: String,
}

impl JobRecord {
    pub fn from_raw(raw: &RawJob, tables: &FacetTables) -> Self {
        let education_map = tables.get(Facet::Education);
        let labels: Vec<&str> = raw
            .option_edu
            .iter()
            .filter_map(|code| education_map.label(code))
            .collect();
        let education = if labels.is_empty() {
            "不拘".to_string()
        } else {
            labels.join("、")
        };

        Self {
            id: raw.job_no.clone(),
            title: raw.job_name.trim().to_string(),
            company: raw.cust_name.trim().to_string(),
            location: raw.job_addr_no_desc.trim().to_string(),
            salary: SalaryDescriptor::from_bounds(raw.salary_low, raw.salary_high),
            education,
            experience_years: (raw.period > 0).then_some(raw.period),
            posted: format_posting_date(&raw.appear_date),
            link: detail_link(raw),
            description: preview(&raw.description, DESCRIPTION_PREVIEW_CHARS),
        }
    }
}

/// Prefers the provider's own link (which may be protocol-relative) and falls
/// back to the canonical `/job/{jobNo}` address.
fn detail_link(raw: &RawJob) -> String {
    let provided = raw.link.as_ref().map(|l| l.job.trim()).unwrap_or_default();
    if let Some(rest) = provided.strip_prefix("//") {
        format!("https://{rest}")
    } else if provided.starts_with("http") {
        provided.to_string()
    } else {
        format!("https://www.104.com.tw/job/{}", raw.job_no)
    }
}

/// `20240115` → `2024/01/15`; anything else is passed through.
fn format_posting_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}/{}/{}", &raw[..4], &raw[4..6], &raw[6..])
    } else {
        raw.to_string()
    }
}

/// Whitespace-collapsed, cut at `limit` characters with a trailing `...`.
fn preview(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > limit {
        let cut: String = collapsed.chars().take(limit).collect();
        format!("{cut}...")
    } else {
        collapsed
    }
}
