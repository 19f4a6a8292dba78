//! Marker-driven section slicing over rendered page text.
//!
//! Works on plain lines so it can be exercised without a browser: each
//! `SectionRule` names the marker that opens a section, the markers that close
//! it, and a filter deciding which lines inside it are worth keeping.

use serde::{Deserialize, Serialize};

use crate::extraction::text::truncate_with_ellipsis;

/// Named blocks of a job-board posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    JobContent,
    JobCategory,
    Compensation,
    Conditions,
    Requirements,
    Benefits,
    Contact,
}

impl SectionKey {
    pub fn label(self) -> &'static str {
        match self {
            SectionKey::JobContent => "工作內容",
            SectionKey::JobCategory => "職務類別",
            SectionKey::Compensation => "工作待遇",
            SectionKey::Conditions => "工作條件",
            SectionKey::Requirements => "條件要求",
            SectionKey::Benefits => "福利制度",
            SectionKey::Contact => "聯絡方式",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub key: SectionKey,
    pub lines: Vec<String>,
}

impl Section {
    /// `【label】` heading followed by the section's lines, capped at `limit`.
    pub fn render(&self, limit: usize) -> String {
        let body = truncate_with_ellipsis(&self.lines.join("\n"), limit);
        format!("【{}】\n{}", self.key.label(), body)
    }
}

pub struct SectionRule {
    pub key: SectionKey,
    pub start: &'static [&'static str],
    pub end: &'static [&'static str],
    pub filter: fn(&str) -> bool,
}

/// Slices `lines` into sections, in rule order.
///
/// A section opens at the first line starting with one of its `start`
/// markers (text after the marker on that line is kept) and runs until a line
/// starting with one of its `end` markers. Sections with no surviving lines
/// are omitted.
pub fn slice_sections(lines: &[&str], rules: &[SectionRule]) -> Vec<Section> {
    let trimmed: Vec<&str> = lines.iter().map(|l| l.trim()).collect();
    let mut sections = Vec::new();

    for rule in rules {
        let Some((start_idx, marker)) = trimmed.iter().enumerate().find_map(|(i, line)| {
            rule.start
                .iter()
                .find(|m| line.starts_with(**m))
                .map(|m| (i, *m))
        }) else {
            continue;
        };

        let mut collected = Vec::new();
        let inline = trimmed[start_idx][marker.len()..]
            .trim_start_matches([':', '：'])
            .trim();
        if !inline.is_empty() && (rule.filter)(inline) {
            collected.push(inline.to_string());
        }

        for line in &trimmed[start_idx + 1..] {
            if rule.end.iter().any(|m| line.starts_with(m)) {
                break;
            }
            if !line.is_empty() && (rule.filter)(line) {
                collected.push(line.to_string());
            }
        }

        if !collected.is_empty() {
            sections.push(Section {
                key: rule.key,
                lines: collected,
            });
        }
    }

    sections
}

/// Lines between the first `start` marker (or the top) and the first `stop`
/// marker after it, filtered and joined with newlines.
pub fn bounded_text(
    lines: &[&str],
    start: &[&str],
    stop: &[&str],
    filter: fn(&str) -> bool,
) -> String {
    let trimmed: Vec<&str> = lines.iter().map(|l| l.trim()).collect();
    let begin = trimmed
        .iter()
        .position(|line| start.iter().any(|m| line.contains(m)))
        .unwrap_or(0);

    trimmed[begin..]
        .iter()
        .take_while(|line| !stop.iter().any(|m| line.contains(m)))
        .filter(|line| !line.is_empty() && filter(line))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep_all(_: &str) -> bool {
        true
    }

    fn no_buttons(line: &str) -> bool {
        !line.contains("按鈕")
    }

    const RULES: &[SectionRule] = &[
        SectionRule {
            key: SectionKey::JobContent,
            start: &["工作內容"],
            end: &["職務類別", "工作待遇"],
            filter: no_buttons,
        },
        SectionRule {
            key: SectionKey::JobCategory,
            start: &["職務類別"],
            end: &["工作待遇"],
            filter: keep_all,
        },
        SectionRule {
            key: SectionKey::Compensation,
            start: &["工作待遇"],
            end: &["福利制度"],
            filter: keep_all,
        },
    ];

    #[test]
    fn test_slices_in_rule_order_with_inline_text() {
        let lines = [
            "頂部導覽",
            "工作內容",
            "開發後端 API",
            "分享按鈕",
            "",
            "維護資料庫",
            "職務類別：軟體工程師",
            "工作待遇",
            "月薪 50,000 元",
            "福利制度",
            "年終獎金",
        ];
        let sections = slice_sections(&lines, RULES);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].key, SectionKey::JobContent);
        assert_eq!(sections[0].lines, vec!["開發後端 API", "維護資料庫"]);
        assert_eq!(sections[1].lines, vec!["軟體工程師"]);
        assert_eq!(sections[2].lines, vec!["月薪 50,000 元"]);
    }

    #[test]
    fn test_missing_markers_yield_fewer_sections() {
        let lines = ["工作內容", "寫程式"];
        let sections = slice_sections(&lines, RULES);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].lines, vec!["寫程式"]);
    }

    #[test]
    fn test_empty_section_is_omitted() {
        let lines = ["工作內容", "職務類別", "軟體工程師"];
        let sections = slice_sections(&lines, RULES);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].key, SectionKey::JobCategory);
    }

    #[test]
    fn test_section_render_is_capped() {
        let section = Section {
            key: SectionKey::Benefits,
            lines: vec!["福".repeat(50)],
        };
        let rendered = section.render(10);
        assert!(rendered.starts_with("【福利制度】\n"));
        assert!(rendered.ends_with("..."));
    }

    #[test]
    fn test_bounded_text_between_markers() {
        let lines = ["登入", "職缺標題", "內文一", "相似職缺", "別的工作"];
        let text = bounded_text(&lines, &["職缺標題"], &["相似職缺"], keep_all);
        assert_eq!(text, "職缺標題\n內文一");
    }

    #[test]
    fn test_bounded_text_without_start_marker_starts_at_top() {
        let lines = ["a", "b", "STOP", "c"];
        assert_eq!(bounded_text(&lines, &["zzz"], &["STOP"], keep_all), "a\nb");
    }
}
