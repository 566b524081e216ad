//! Pulling anchors and readable text out of fetched markup.

use crate::error::{Result, ScanError};
use scraper::node::Element;
use scraper::{Html, Node, Selector};
use std::fmt;
use tracing::warn;

pub const DEFAULT_PARAGRAPH_CHAR_LIMIT: usize = 5000;
pub const DEFAULT_HEURISTIC_CHAR_LIMIT: usize = 2000;
pub const DEFAULT_MIN_FRAGMENT_LEN: usize = 30;

/// Elements whose text is never prose.
const NON_PROSE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Which elements count as carrying readable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorPolicy {
    /// Text inside `<p>` only.
    Paragraphs,
    /// `<p>`, `<h1>`-`<h3>` and bare `<div>`s (no class, no id).
    Heuristic,
}

impl SelectorPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "paragraphs" | "paragraph" | "p" => Some(SelectorPolicy::Paragraphs),
            "heuristic" => Some(SelectorPolicy::Heuristic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorPolicy::Paragraphs => "paragraphs",
            SelectorPolicy::Heuristic => "heuristic",
        }
    }

    fn selects(&self, element: &Element) -> bool {
        match (self, element.name()) {
            (_, "p") => true,
            (SelectorPolicy::Heuristic, "h1" | "h2" | "h3") => true,
            (SelectorPolicy::Heuristic, "div") => {
                element.attr("class").is_none() && element.attr("id").is_none()
            }
            _ => false,
        }
    }
}

impl fmt::Display for SelectorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub policy: SelectorPolicy,
    pub min_fragment_len: usize,
    pub char_limit: usize,
}

impl ExtractOptions {
    pub fn paragraphs() -> Self {
        Self {
            policy: SelectorPolicy::Paragraphs,
            min_fragment_len: 0,
            char_limit: DEFAULT_PARAGRAPH_CHAR_LIMIT,
        }
    }

    pub fn heuristic() -> Self {
        Self {
            policy: SelectorPolicy::Heuristic,
            min_fragment_len: DEFAULT_MIN_FRAGMENT_LEN,
            char_limit: DEFAULT_HEURISTIC_CHAR_LIMIT,
        }
    }

    pub fn for_policy(policy: SelectorPolicy) -> Self {
        match policy {
            SelectorPolicy::Paragraphs => Self::paragraphs(),
            SelectorPolicy::Heuristic => Self::heuristic(),
        }
    }

    pub fn with_char_limit(mut self, char_limit: usize) -> Self {
        self.char_limit = char_limit;
        self
    }

    pub fn with_min_fragment_len(mut self, min_fragment_len: usize) -> Self {
        self.min_fragment_len = min_fragment_len;
        self
    }
}

/// Extract readable text from `markup` according to `options`.
///
/// Never fails: a page with nothing matching yields an empty string. The
/// result is at most `options.char_limit` characters long.
pub fn extract_text(markup: &str, options: &ExtractOptions) -> String {
    let document = Html::parse_document(markup);
    let fragments = text_fragments(&document, options.policy);

    let joined = match options.policy {
        SelectorPolicy::Paragraphs => fragments
            .iter()
            .flat_map(|fragment| fragment.split_whitespace())
            .collect::<Vec<_>>()
            .join(" "),
        SelectorPolicy::Heuristic => fragments
            .into_iter()
            .filter(|fragment| fragment.chars().count() >= options.min_fragment_len)
            .collect::<Vec<_>>()
            .join(" "),
    };

    truncate_chars(&joined, options.char_limit).to_string()
}

/// Trimmed, non-empty text nodes under an element the policy selects, in
/// document order. Each text node appears once however many selected
/// ancestors enclose it.
fn text_fragments(document: &Html, policy: SelectorPolicy) -> Vec<&str> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some((node, text.trim())),
            _ => None,
        })
        .filter(|(_, text)| !text.is_empty())
        .filter(|(node, _)| {
            is_selected_text(node.ancestors().filter_map(|a| a.value().as_element()), policy)
        })
        .map(|(_, text)| text)
        .collect()
}

fn is_selected_text<'a>(ancestors: impl Iterator<Item = &'a Element>, policy: SelectorPolicy) -> bool {
    let mut selected = false;
    for element in ancestors {
        if NON_PROSE_TAGS.contains(&element.name()) {
            return false;
        }
        selected |= policy.selects(element);
    }
    selected
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Raw anchor targets found on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    /// `href` of the document's `<base>` element, if any.
    pub base_href: Option<String>,
    /// `href` of every `<a>` in document order, duplicates included.
    pub hrefs: Vec<String>,
}

pub fn extract_links(markup: &str) -> Result<PageLinks> {
    let document = Html::parse_document(markup);
    let anchor_selector = selector("a[href]")?;
    let base_selector = selector("base[href]")?;

    let base_href = document
        .select(&base_selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string());

    let hrefs = document
        .select(&anchor_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect();

    Ok(PageLinks { base_href, hrefs })
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| {
        warn!("Failed to parse selector '{}': {}", css, e);
        ScanError::ParseError(format!("selector '{}': {}", css, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_A: &str = "This sentence is comfortably longer than thirty characters.";
    const LONG_B: &str = "Another fragment that easily clears the minimum length.";

    #[test]
    fn test_paragraphs_collapse_whitespace() {
        let html = "<html><body><p>  Hello\n\n   <b>brave</b>   new\tworld </p><p>Second</p></body></html>";
        let text = extract_text(html, &ExtractOptions::paragraphs());
        assert_eq!(text, "Hello brave new world Second");
    }

    #[test]
    fn test_paragraphs_ignore_other_elements() {
        let html = "<h1>Title</h1><div>Loose div text</div><p>Body</p><span>Aside</span>";
        let text = extract_text(html, &ExtractOptions::paragraphs());
        assert_eq!(text, "Body");
    }

    #[test]
    fn test_paragraphs_keep_short_fragments() {
        let html = "<p>a</p><p>b</p>";
        assert_eq!(extract_text(html, &ExtractOptions::paragraphs()), "a b");
    }

    #[test]
    fn test_paragraphs_truncate_to_limit() {
        let html = format!("<p>{}</p>", "word ".repeat(2000));
        let text = extract_text(&html, &ExtractOptions::paragraphs());
        assert_eq!(text.chars().count(), DEFAULT_PARAGRAPH_CHAR_LIMIT);

        let text = extract_text(&html, &ExtractOptions::paragraphs().with_char_limit(9));
        assert_eq!(text, "word word");
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let html = "<p>ééééééééé</p>";
        let text = extract_text(html, &ExtractOptions::paragraphs().with_char_limit(4));
        assert_eq!(text, "éééé");
    }

    #[test]
    fn test_heuristic_drops_short_fragments() {
        let html = format!("<p>{}</p><p>Too short</p><h2>{}</h2>", LONG_A, LONG_B);
        let text = extract_text(&html, &ExtractOptions::heuristic());
        assert_eq!(text, format!("{} {}", LONG_A, LONG_B));
    }

    #[test]
    fn test_heuristic_fragment_at_minimum_is_kept() {
        let exact = "x".repeat(DEFAULT_MIN_FRAGMENT_LEN);
        let html = format!("<p>{}</p><p>{}</p>", exact, &exact[1..]);
        let text = extract_text(&html, &ExtractOptions::heuristic());
        assert_eq!(text, exact);
    }

    #[test]
    fn test_heuristic_selects_bare_divs_and_headers() {
        let html = format!(
            "<div>{}</div><div class=\"nav\">{}</div><div id=\"footer\">{}</div><h3>{}</h3><h4>{}</h4>",
            LONG_A, LONG_B, LONG_B, LONG_B, LONG_A
        );
        let text = extract_text(&html, &ExtractOptions::heuristic());
        assert_eq!(text, format!("{} {}", LONG_A, LONG_B));
    }

    #[test]
    fn test_heuristic_counts_nested_text_once() {
        let html = format!("<div><div><p>{}</p></div></div>", LONG_A);
        let text = extract_text(&html, &ExtractOptions::heuristic());
        assert_eq!(text, LONG_A);
    }

    #[test]
    fn test_heuristic_keeps_internal_whitespace() {
        let fragment = "spaced    out   text that is longer than thirty chars";
        let html = format!("<p>  {}  </p>", fragment);
        let text = extract_text(&html, &ExtractOptions::heuristic());
        assert_eq!(text, fragment);
    }

    #[test]
    fn test_heuristic_truncates_to_limit() {
        let html = format!("<p>{}</p>", LONG_A.repeat(100));
        let text = extract_text(&html, &ExtractOptions::heuristic());
        assert_eq!(text.chars().count(), DEFAULT_HEURISTIC_CHAR_LIMIT);
    }

    #[test]
    fn test_scripts_and_styles_are_not_prose() {
        let html = format!(
            "<div><script>var tracking = 'a long inline script body here';</script><style>.x {{ color: red; margin: 0 auto; }}</style>{}</div>",
            LONG_A
        );
        let text = extract_text(&html, &ExtractOptions::heuristic());
        assert_eq!(text, LONG_A);
    }

    #[test]
    fn test_no_matching_nodes_yields_empty_string() {
        let html = "<html><body><span>nothing here</span></body></html>";
        assert_eq!(extract_text(html, &ExtractOptions::paragraphs()), "");
        assert_eq!(extract_text(html, &ExtractOptions::heuristic()), "");
        assert_eq!(extract_text("", &ExtractOptions::heuristic()), "");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(SelectorPolicy::from_str("p"), Some(SelectorPolicy::Paragraphs));
        assert_eq!(
            SelectorPolicy::from_str("Paragraphs"),
            Some(SelectorPolicy::Paragraphs)
        );
        assert_eq!(
            SelectorPolicy::from_str("HEURISTIC"),
            Some(SelectorPolicy::Heuristic)
        );
        assert_eq!(SelectorPolicy::from_str("xpath"), None);
    }

    #[test]
    fn test_for_policy_defaults() {
        let options = ExtractOptions::for_policy(SelectorPolicy::Heuristic);
        assert_eq!(options.char_limit, 2000);
        assert_eq!(options.min_fragment_len, 30);

        let options = ExtractOptions::for_policy(SelectorPolicy::Paragraphs);
        assert_eq!(options.char_limit, 5000);
        assert_eq!(options.min_fragment_len, 0);
    }

    #[test]
    fn test_extract_links_in_document_order() {
        let html = r#"<a href="/a">A</a><a href=" b ">B</a><a>no href</a><a href="/a">again</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links.hrefs, vec!["/a", "b", "/a"]);
        assert_eq!(links.base_href, None);
    }

    #[test]
    fn test_extract_links_reads_base_href() {
        let html = r#"<html><head><base href="https://static.example.com/root/"></head><body><a href="x">X</a></body></html>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(
            links.base_href.as_deref(),
            Some("https://static.example.com/root/")
        );
        assert_eq!(links.hrefs, vec!["x"]);
    }
}
