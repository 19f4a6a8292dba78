//! Result formatter: renders search hits as a bounded text block for the LLM
//! (or for direct display when no second turn is wanted).

use std::fmt::Write;

use crate::search::facets::FacetTables;
use crate::search::models::{JobRecord, SearchPayload};

pub const NO_MATCHES: &str = "沒有找到符合條件的工作。";

/// Formats a raw provider payload, including its error envelope.
pub fn format_payload(payload: &SearchPayload, tables: &FacetTables, max: usize) -> String {
    if !payload.is_ok() {
        let message = payload
            .error_msg
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("未知錯誤");
        return format!("搜尋失敗：{message}");
    }

    let records: Vec<JobRecord> = payload
        .jobs()
        .iter()
        .map(|raw| JobRecord::from_raw(raw, tables))
        .collect();
    format_records(&records, payload.total_count(), max)
}

/// Header plus one numbered entry per record, at most `max` entries.
/// `max == 0` yields the header alone.
pub fn format_records(records: &[JobRecord], total: u64, max: usize) -> String {
    if records.is_empty() {
        return NO_MATCHES.to_string();
    }

    let shown = &records[..records.len().min(max)];
    let total = total.max(records.len() as u64);
    let mut out = format!(
        "找到 {} 筆工作，以下是前 {} 筆：\n",
        group_thousands(total),
        shown.len()
    );

    for (i, job) in shown.iter().enumerate() {
        let experience = match job.experience_years {
            Some(years) => format!("{years} 年以上"),
            None => "不拘".to_string(),
        };
        // writing into a String cannot fail
        let _ = write!(
            out,
            "\n{}. {}\n   公司：{}\n   地區：{}\n   薪資：{}\n   學歷：{}\n   經歷：{}\n   更新：{}\n   連結：{}\n",
            i + 1,
            job.title,
            job.company,
            job.location,
            job.salary,
            job.education,
            experience,
            job.posted,
            job.link,
        );
        if !job.description.is_empty() {
            let _ = writeln!(out, "   描述：{}", job.description);
        }
    }

    out
}

/// `1234567` → `1,234,567`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
