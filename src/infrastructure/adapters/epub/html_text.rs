//! XHTML → 纯文本
//!
//! 丢弃 script/style/head，跳过图片等非文本元素，
//! 块级元素之间保留换行，其余空白合并为单个空格

use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

static HEADING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").expect("valid heading selector"));

const DROPPED: &[&str] = &["script", "style", "head", "title", "noscript"];
const NON_TEXT: &[&str] = &["img", "svg", "image", "video", "audio", "object", "math", "iframe"];
const BLOCKS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "blockquote", "tr", "table", "hr", "pre", "figure", "aside", "header", "footer", "dd", "dt",
];

/// 单个文档的抽取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlText {
    /// 第一个非空 h1/h2/h3
    pub title: Option<String>,
    /// 段落之间以 '\n' 分隔
    pub text: String,
    /// 被跳过的非文本元素个数
    pub skipped_elements: usize,
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn walk(element: ElementRef<'_>, raw: &mut String, skipped: &mut usize) {
    for child in element.children() {
        match child.value() {
            // 源文件中的换行不是段落边界
            Node::Text(text) => raw.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c })),
            Node::Element(el) => {
                let name = el.name();
                if DROPPED.contains(&name) {
                    continue;
                }
                if NON_TEXT.contains(&name) {
                    *skipped += 1;
                    continue;
                }
                let block = BLOCKS.contains(&name);
                if block {
                    raw.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, raw, skipped);
                }
                if block {
                    raw.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// 抽取文档的标题与正文
pub fn extract_text(html: &str) -> HtmlText {
    let document = Html::parse_document(html);

    let title = document
        .select(&HEADING_SELECTOR)
        .map(|h| collapse(&h.text().collect::<String>()))
        .find(|t| !t.is_empty());

    let mut raw = String::new();
    let mut skipped_elements = 0;
    walk(document.root_element(), &mut raw, &mut skipped_elements);

    let text = raw
        .lines()
        .map(collapse)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    HtmlText {
        title,
        text,
        skipped_elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_and_whitespace() {
        let html = r#"<html><head><title>ignored</title><style>p { color: red }</style></head>
            <body><h1>  Chapter   One </h1>
            <p>It was   a dark
               and stormy night.</p>
            <p>The <em>end</em>.</p></body></html>"#;
        let out = extract_text(html);

        assert_eq!(out.title.as_deref(), Some("Chapter One"));
        assert_eq!(out.text, "Chapter One\nIt was a dark and stormy night.\nThe end.");
        assert_eq!(out.skipped_elements, 0);
    }

    #[test]
    fn test_scripts_and_images_are_dropped() {
        let html = r#"<html><body><script>var x = 1;</script>
            <p>Before</p><img src="a.png" alt="pic"/><svg><text>vector</text></svg><p>After</p>
            </body></html>"#;
        let out = extract_text(html);

        assert_eq!(out.text, "Before\nAfter");
        assert_eq!(out.skipped_elements, 2);
        assert_eq!(out.title, None);
    }

    #[test]
    fn test_first_non_empty_heading_wins() {
        let html = "<html><body><h1> </h1><h2>Real Title</h2><h3>Sub</h3><p>x</p></body></html>";
        assert_eq!(extract_text(html).title.as_deref(), Some("Real Title"));
    }

    #[test]
    fn test_hard_wrapped_source_stays_one_paragraph() {
        let html = "<html><body><p>First line\nsecond line\r\n  third.</p><div>Next<br/>line</div></body></html>";
        let out = extract_text(html);

        assert_eq!(out.text, "First line second line third.\nNext\nline");
    }

    #[test]
    fn test_empty_document() {
        let out = extract_text("<html><body></body></html>");
        assert!(out.text.is_empty());
    }
}
