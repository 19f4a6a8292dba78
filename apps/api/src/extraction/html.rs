//! Server-rendered HTML → flat text summary.

use scraper::{ElementRef, Html, Node, Selector};

use crate::extraction::text::{collapse_whitespace, truncate_chars, truncate_with_ellipsis};

/// Subtrees that never carry posting content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];

const MAIN_CONTENT_SELECTORS: &[&str] = &["main", "article", "body"];

pub const CONTENT_PREVIEW_CHARS: usize = 1500;
pub const SUMMARY_MAX_CHARS: usize = 2000;

/// Title, first H1, and main-area text, bounded to [`SUMMARY_MAX_CHARS`].
/// Returns `None` when the page has nothing readable.
pub fn summarize_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title", false);
    let heading = first_text(&document, "h1", true);
    let content = MAIN_CONTENT_SELECTORS
        .iter()
        .find_map(|selector| {
            let Ok(selector) = Selector::parse(selector) else {
                return None;
            };
            document.select(&selector).find(|el| !inside_skipped(*el))
        })
        .map(|el| {
            let mut raw = String::new();
            visible_text(el, &mut raw);
            collapse_whitespace(&raw)
        })
        .unwrap_or_default();

    let mut parts = Vec::new();
    if !title.is_empty() {
        parts.push(format!("頁面標題：{title}"));
    }
    if !heading.is_empty() && heading != title {
        parts.push(format!("主標題：{heading}"));
    }
    if !content.is_empty() {
        parts.push(format!(
            "內容：{}",
            truncate_chars(&content, CONTENT_PREVIEW_CHARS)
        ));
    }

    if parts.is_empty() {
        return None;
    }
    Some(truncate_with_ellipsis(&parts.join("\n"), SUMMARY_MAX_CHARS))
}

fn first_text(document: &Html, selector: &str, skip_boilerplate: bool) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .find(|el| !skip_boilerplate || !inside_skipped(*el))
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn inside_skipped(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|el| SKIPPED_TAGS.contains(&el.name()))
}

/// Depth-first text collection that prunes [`SKIPPED_TAGS`] subtrees.
fn visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if SKIPPED_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    visible_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
        <head><title>資深後端工程師 | 範例科技</title><style>body { color: red }</style></head>
        <body>
            <header><h1>網站導覽</h1></header>
            <nav>首頁 職缺 登入</nav>
            <main>
                <h1>資深後端工程師</h1>
                <p>負責   設計與開發 API。</p>
                <script>var tracking = 1;</script>
            </main>
            <footer>版權所有</footer>
        </body>
    </html>"#;

    #[test]
    fn test_summary_layout() {
        let summary = summarize_html(PAGE).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "頁面標題：資深後端工程師 | 範例科技");
        assert_eq!(lines[1], "主標題：資深後端工程師");
        assert!(lines[2].starts_with("內容："));
        assert!(lines[2].contains("負責 設計與開發 API。"));
    }

    #[test]
    fn test_boilerplate_is_stripped() {
        let summary = summarize_html(PAGE).unwrap();
        assert!(!summary.contains("tracking"));
        assert!(!summary.contains("登入"));
        assert!(!summary.contains("版權所有"));
        assert!(!summary.contains("網站導覽"));
    }

    #[test]
    fn test_heading_equal_to_title_is_not_repeated() {
        let html = "<html><head><title>Same</title></head><body><h1>Same</h1><p>x</p></body></html>";
        let summary = summarize_html(html).unwrap();
        assert!(!summary.contains("主標題"));
    }

    #[test]
    fn test_long_body_is_bounded() {
        let body = "字".repeat(5000);
        let title = "標".repeat(800);
        let html = format!("<html><head><title>{title}</title></head><body><h1>{title}x</h1><p>{body}</p></body></html>");
        let summary = summarize_html(&html).unwrap();
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(summarize_html("<html><body>   </body></html>"), None);
    }
}
