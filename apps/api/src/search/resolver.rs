//! Parameter resolver: loose LLM-produced facets → code-mapped `SearchQuery`.
//!
//! Resolution is total. Unknown labels and malformed values are dropped with a
//! warning and reported back in `Resolution::dropped`; they never abort the
//! request and never disturb the other facets.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::search::facets::{Facet, FacetTables};
use crate::search::models::{push_unique, SearchQuery};

/// A facet value that could not be mapped and was left out of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedFacet {
    pub facet: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    pub query: SearchQuery,
    pub dropped: Vec<DroppedFacet>,
}

/// Parses `"min-max"`, `"min-"`, `"-max"` or `""`.
///
/// A segment that is not a non-negative integer becomes `None`; a string that
/// does not split into exactly two segments yields `(None, None)`.
pub fn parse_salary_range(raw: &str) -> (Option<u64>, Option<u64>) {
    let raw = raw.trim();
    if raw.is_empty() || !raw.contains('-') {
        return (None, None);
    }
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() != 2 {
        return (None, None);
    }
    let bound = |s: &str| s.trim().replace(',', "").parse::<u64>().ok();
    (bound(parts[0]), bound(parts[1]))
}

/// Resolves a loose facet dictionary against the facet tables.
pub fn resolve(params: &Map<String, Value>, tables: &FacetTables) -> Resolution {
    let mut resolver = Resolver {
        tables,
        resolution: Resolution::default(),
        salary_range: (None, None),
    };

    for (key, value) in params {
        resolver.apply(key, value);
    }

    // a parseable salary_range wins over explicit salary_min / salary_max
    if resolver.salary_range != (None, None) {
        let (min, max) = resolver.salary_range;
        resolver.resolution.query.salary_min = min;
        resolver.resolution.query.salary_max = max;
    }

    let query = &mut resolver.resolution.query;
    if let (Some(min), Some(max)) = (query.salary_min, query.salary_max) {
        if min > max {
            warn!("Salary bounds inverted ({min} > {max}); swapping");
            query.salary_min = Some(max);
            query.salary_max = Some(min);
        }
    }

    resolver.resolution
}

struct Resolver<'a> {
    tables: &'a FacetTables,
    resolution: Resolution,
    salary_range: (Option<u64>, Option<u64>),
}

impl Resolver<'_> {
    fn apply(&mut self, key: &str, value: &Value) {
        if value.is_null() {
            return;
        }
        match key {
            "keyword" => {
                if let Some(keyword) = scalar_text(value).filter(|k| !k.is_empty()) {
                    self.resolution.query.keyword = Some(keyword);
                }
            }
            "keyword_in_title_only" => {
                self.resolution.query.keyword_in_title_only = value.as_bool().unwrap_or(false)
            }
            "area" => self.multi(Facet::Area, value),
            "job_category" => self.multi(Facet::JobCategory, value),
            "work_period" => self.multi(Facet::WorkPeriod, value),
            "company_type" => self.multi(Facet::CompanyType, value),
            "welfare" => self.multi(Facet::Welfare, value),
            "education" => self.resolution.query.education = self.single(Facet::Education, value),
            "experience" => {
                self.resolution.query.experience = self.single(Facet::Experience, value)
            }
            "rotation" => self.resolution.query.rotation = self.single(Facet::Rotation, value),
            "sort_by" => self.resolution.query.sort = self.single(Facet::SortBy, value),
            "sort_order" => {
                self.resolution.query.sort_ascending = scalar_text(value)
                    .map(|s| s.eq_ignore_ascii_case("asc"))
                    .unwrap_or(false)
            }
            "sort_ascending" => {
                self.resolution.query.sort_ascending = value.as_bool().unwrap_or(false)
            }
            "weekend_off" => match value.as_bool() {
                Some(flag) => self.resolution.query.weekend_off = Some(flag),
                None => self.drop_value(key, value),
            },
            "salary_range" => {
                self.salary_range = parse_salary_range(&scalar_text(value).unwrap_or_default())
            }
            "salary_min" | "salary_max" => {
                let bound = non_negative_int(value);
                if bound.is_none() {
                    self.drop_value(key, value);
                }
                let query = &mut self.resolution.query;
                if key == "salary_min" {
                    query.salary_min = bound;
                } else {
                    query.salary_max = bound;
                }
            }
            "posted_within_days" => match non_negative_int(value) {
                Some(days) => {
                    self.resolution.query.posted_within_days = u32::try_from(days).ok()
                }
                None => self.drop_value(key, value),
            },
            other => debug!("Ignoring unknown search parameter '{other}'"),
        }
    }

    fn multi(&mut self, facet: Facet, value: &Value) {
        let tables = self.tables;
        let map = tables.get(facet);
        let mut codes = Vec::new();
        for label in labels(value) {
            match map.code(&label) {
                Some(code) => push_unique(&mut codes, code),
                None => self.drop_label(facet, label),
            }
        }

        let query = &mut self.resolution.query;
        let target = match facet {
            Facet::Area => &mut query.areas,
            Facet::JobCategory => &mut query.job_categories,
            Facet::WorkPeriod => &mut query.work_periods,
            Facet::CompanyType => &mut query.company_types,
            _ => &mut query.welfare,
        };
        for code in &codes {
            push_unique(target, code);
        }
    }

    fn single(&mut self, facet: Facet, value: &Value) -> Option<String> {
        let tables = self.tables;
        let mut resolved = None;
        for label in labels(value) {
            match tables.get(facet).code(&label) {
                Some(code) if resolved.is_none() => resolved = Some(code.to_string()),
                Some(_) => debug!("Extra {} value '{label}' ignored", facet.key()),
                None => self.drop_label(facet, label),
            }
        }
        resolved
    }

    fn drop_label(&mut self, facet: Facet, label: String) {
        warn!("Unmapped {} value '{}' dropped", facet.key(), label);
        self.resolution.dropped.push(DroppedFacet {
            facet: facet.key().to_string(),
            value: label,
        });
    }

    fn drop_value(&mut self, key: &str, value: &Value) {
        warn!("Malformed {key} value '{value}' dropped");
        self.resolution.dropped.push(DroppedFacet {
            facet: key.to_string(),
            value: value.to_string(),
        });
    }
}

/// Text form of a string or number value.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts an array of labels or a single, possibly comma-separated, label.
fn labels(value: &Value) -> Vec<String> {
    let split = |s: &str| -> Vec<String> {
        s.split([',', '，', '、'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect(),
        other => scalar_text(other).map(|s| split(&s)).unwrap_or_default(),
    }
}

fn non_negative_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
