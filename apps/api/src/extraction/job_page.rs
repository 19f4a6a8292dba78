//! Job-board posting extraction rules and the browser-independent assembly
//! steps: section slicing, selector-field summary, and the full-text fallback.

use crate::extraction::sections::{bounded_text, slice_sections, SectionKey, SectionRule};
use crate::extraction::text::{collapse_whitespace, truncate_chars};
use crate::extraction::ExtractedContent;

/// Fewer recovered sections than this means the layout was not recognised.
pub const MIN_SECTIONS: usize = 3;
pub const BODY_PREVIEW_CHARS: usize = 1500;
pub const FIELD_DESCRIPTION_CHARS: usize = 500;

/// Navigation, buttons, and site chrome that leak into `innerText`.
const NOISE_KEYWORDS: &[&str] = &[
    "應徵",
    "儲存",
    "分享",
    "檢舉",
    "回報",
    "登入",
    "註冊",
    "看更多",
    "收藏",
    "找工作",
    "找公司",
    "下載 APP",
    "104人力銀行",
    "Copyright",
    "©",
];

const DUMP_START_MARKERS: &[&str] = &["工作內容"];
const DUMP_STOP_MARKERS: &[&str] = &["相似職缺", "其他人也看了", "看過此職缺的人也看了", "©"];

fn keep_content_line(line: &str) -> bool {
    line.chars().count() > 1 && !NOISE_KEYWORDS.iter().any(|k| line.contains(k))
}

pub const JOB_BOARD_SECTIONS: &[SectionRule] = &[
    SectionRule {
        key: SectionKey::JobContent,
        start: &["工作內容"],
        end: &["職務類別", "工作待遇", "工作性質", "上班地點"],
        filter: keep_content_line,
    },
    SectionRule {
        key: SectionKey::JobCategory,
        start: &["職務類別"],
        end: &["工作待遇", "工作性質", "上班地點", "管理責任"],
        filter: keep_content_line,
    },
    SectionRule {
        key: SectionKey::Compensation,
        start: &["工作待遇"],
        end: &["工作性質", "上班地點", "管理責任", "出差外派"],
        filter: keep_content_line,
    },
    SectionRule {
        key: SectionKey::Conditions,
        start: &["工作性質"],
        end: &["條件要求", "福利制度", "聯絡方式"],
        filter: keep_content_line,
    },
    SectionRule {
        key: SectionKey::Requirements,
        start: &["條件要求"],
        end: &["福利制度", "法定項目", "聯絡方式"],
        filter: keep_content_line,
    },
    SectionRule {
        key: SectionKey::Benefits,
        start: &["福利制度"],
        end: &["聯絡方式", "公司介紹", "相似職缺"],
        filter: keep_content_line,
    },
    SectionRule {
        key: SectionKey::Contact,
        start: &["聯絡方式"],
        end: &["公司介紹", "相似職缺", "其他人也看了"],
        filter: keep_content_line,
    },
];

/// One headline field probed by CSS selector, first match wins.
pub struct FieldProbe {
    pub label: &'static str,
    pub selectors: &'static [&'static str],
    pub max_chars: Option<usize>,
}

pub const JOB_FIELD_PROBES: &[FieldProbe] = &[
    FieldProbe {
        label: "職位",
        selectors: &["h1", "[data-qa=\"job-title\"]", ".job-header__title", ".job__title"],
        max_chars: None,
    },
    FieldProbe {
        label: "公司",
        selectors: &["[data-qa=\"company-name\"]", ".job-header__company", ".company-name"],
        max_chars: None,
    },
    FieldProbe {
        label: "薪資",
        selectors: &["[data-qa=\"salary\"]", ".job-header__salary", ".salary"],
        max_chars: None,
    },
    FieldProbe {
        label: "地點",
        selectors: &["[data-qa=\"job-location\"]", ".job-header__location", ".location"],
        max_chars: None,
    },
    FieldProbe {
        label: "職位描述",
        selectors: &["[data-qa=\"job-description\"]", ".job-description", ".description"],
        max_chars: Some(FIELD_DESCRIPTION_CHARS),
    },
];

/// Structured sections when the page yields at least [`MIN_SECTIONS`].
pub fn structured_sections(body: &str) -> Option<ExtractedContent> {
    let lines: Vec<&str> = body.lines().collect();
    let sections = slice_sections(&lines, JOB_BOARD_SECTIONS);
    (sections.len() >= MIN_SECTIONS).then_some(ExtractedContent::Sections(sections))
}

/// `label：text` lines for every probe that matched.
pub fn summarize_fields(found: &[(&FieldProbe, String)]) -> Option<ExtractedContent> {
    let lines: Vec<String> = found
        .iter()
        .filter_map(|(probe, text)| {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let text = match probe.max_chars {
                Some(limit) => truncate_chars(text, limit),
                None => text,
            };
            Some(format!("{}：{}", probe.label, text))
        })
        .collect();
    (!lines.is_empty()).then(|| ExtractedContent::Summary(lines.join("\n")))
}

/// Noise-filtered body text between the posting's start and stop markers.
pub fn fallback_dump(body: &str) -> Option<ExtractedContent> {
    let lines: Vec<&str> = body.lines().collect();
    let text = bounded_text(&lines, DUMP_START_MARKERS, DUMP_STOP_MARKERS, keep_content_line);
    page_text(&text)
}

/// Whole visible text of a page that has no dedicated extractor.
pub fn generic_page(body: &str) -> Option<ExtractedContent> {
    page_text(body)
}

fn page_text(text: &str) -> Option<ExtractedContent> {
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        return None;
    }
    Some(ExtractedContent::Summary(format!(
        "頁面內容：{}",
        truncate_chars(&collapsed, BODY_PREVIEW_CHARS)
    )))
}
