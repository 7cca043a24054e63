//! Extraction of structured HTML/CSS from free-form backend replies.
//!
//! Backends are asked for raw HTML but regularly answer with markdown
//! fences, partial documents or plain prose. [`parse`] turns any of those
//! into a [`NormalizedOutput`] using ordered pattern matching. It is not an
//! HTML parser and it never fails: the worst case wraps the reply verbatim.
//!
//! The output is NOT sanitized. Plain-text replies are embedded without
//! escaping, so callers must sanitize before injecting it into a page.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::OutputFormat;

lazy_static! {
    /// A fenced block with an optional language tag: ```lang ... ```
    static ref FENCED_BLOCK: Regex = Regex::new(
        r"(?s)```([A-Za-z0-9_+-]*)(.*?)```"
    ).unwrap();

    /// A full document, tags inclusive
    static ref HTML_DOCUMENT: Regex = Regex::new(
        r"(?si)<html[^>]*>.*?</html>"
    ).unwrap();

    static ref BODY_TAG: Regex = Regex::new(
        r"(?si)<body[^>]*>(.*?)</body>"
    ).unwrap();

    static ref STYLE_TAG: Regex = Regex::new(
        r"(?si)<style[^>]*>(.*?)</style>"
    ).unwrap();
}

/// HTML and CSS extracted from a backend reply. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedOutput {
    pub html: String,
    pub css: String,
}

/// One fenced block found in a reply.
struct Fence<'a> {
    lang: &'a str,
    body: &'a str,
}

fn fences(raw: &str) -> impl Iterator<Item = Fence<'_>> {
    FENCED_BLOCK.captures_iter(raw).filter_map(|caps| {
        Some(Fence {
            lang: caps.get(1)?.as_str(),
            body: caps.get(2)?.as_str().trim(),
        })
    })
}

/// Parse a raw backend reply into HTML and CSS.
///
/// `format` does not change the extraction; Tailwind replies simply tend to
/// carry no stylesheet, which leaves `css` empty.
pub fn parse(raw: &str, format: OutputFormat) -> NormalizedOutput {
    let raw = raw.trim();

    let css = extract_css(raw);
    let html = extract_html(raw, &css);

    tracing::trace!(
        format = %format,
        html_len = html.len(),
        css_len = css.len(),
        "Normalized backend reply"
    );

    NormalizedOutput {
        html: html.trim().to_string(),
        css: css.trim().to_string(),
    }
}

/// CSS priority: ```css fence, then a <style> block, else empty.
fn extract_css(raw: &str) -> String {
    if let Some(fence) = fences(raw).find(|f| f.lang.eq_ignore_ascii_case("css")) {
        return fence.body.to_string();
    }

    if let Some(caps) = STYLE_TAG.captures(raw) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str().trim().to_string();
        }
    }

    String::new()
}

/// HTML priority: full document, html/untagged fence starting with `<`,
/// body contents (with the extracted CSS inlined), raw markup, then a
/// minimal shell around the raw text.
fn extract_html(raw: &str, css: &str) -> String {
    if let Some(document) = HTML_DOCUMENT.find(raw) {
        return document.as_str().trim().to_string();
    }

    let html_fence = fences(raw).find(|f| f.lang.is_empty() || f.lang.eq_ignore_ascii_case("html"));
    if let Some(fence) = html_fence {
        if fence.body.starts_with('<') {
            return fence.body.to_string();
        }
    }

    if let Some(caps) = BODY_TAG.captures(raw) {
        if let Some(inner) = caps.get(1) {
            let inner = inner.as_str().trim();
            if css.is_empty() {
                return inner.to_string();
            }
            return format!("<style>{}</style>\n{}", css, inner);
        }
    }

    if raw.starts_with('<') {
        return raw.to_string();
    }

    format!("<html><body><p>{}</p></body></html>", raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_css(raw: &str) -> NormalizedOutput {
        parse(raw, OutputFormat::HtmlCss)
    }

    #[test]
    fn test_fenced_document_and_css() {
        let raw = "Here you go:\n```html\n<html><body><h1>Hi</h1></body></html>\n```\n\n```css\nh1{color:red}\n```\n";
        let out = html_css(raw);
        assert_eq!(out.html, "<html><body><h1>Hi</h1></body></html>");
        assert_eq!(out.css, "h1{color:red}");
    }

    #[test]
    fn test_plain_text_is_wrapped() {
        let out = html_css("Hello");
        assert_eq!(out.html, "<html><body><p>Hello</p></body></html>");
        assert_eq!(out.css, "");
    }

    #[test]
    fn test_plain_text_is_not_escaped() {
        let out = html_css("  5 > 3 & done  ");
        assert_eq!(out.html, "<html><body><p>5 > 3 & done</p></body></html>");
    }

    #[test]
    fn test_body_block_gets_extracted_css() {
        let raw = "<body>Hi</body>\n```css\np{color:blue}\n```";
        let out = html_css(raw);
        assert_eq!(out.html, "<style>p{color:blue}</style>\nHi");
        assert_eq!(out.css, "p{color:blue}");
    }

    #[test]
    fn test_body_block_without_css() {
        let out = html_css("Sure!\n<body>\n  <main>Menu</main>\n</body>\nEnjoy.");
        assert_eq!(out.html, "<main>Menu</main>");
        assert_eq!(out.css, "");
    }

    #[test]
    fn test_full_document_keeps_embedded_style() {
        let raw = "<!DOCTYPE html>\n<HTML lang=\"en\"><head><style>\n body { margin: 0 }\n</style></head>\n<body><p>x</p></body></HTML>";
        let out = html_css(raw);
        assert!(out.html.starts_with("<HTML lang=\"en\">"));
        assert!(out.html.ends_with("</HTML>"));
        assert!(!out.html.contains("DOCTYPE"));
        assert_eq!(out.css, "body { margin: 0 }");
    }

    #[test]
    fn test_untagged_fence_with_markup() {
        let raw = "```\n<section class=\"hero\">Welcome</section>\n```";
        let out = html_css(raw);
        assert_eq!(out.html, "<section class=\"hero\">Welcome</section>");
    }

    #[test]
    fn test_html_fence_after_css_fence() {
        let raw = "```css\n.card{padding:1rem}\n```\n```html\n<div class=\"card\">A</div>\n```";
        let out = html_css(raw);
        assert_eq!(out.html, "<div class=\"card\">A</div>");
        assert_eq!(out.css, ".card{padding:1rem}");
    }

    #[test]
    fn test_fence_without_markup_is_skipped() {
        let raw = "```html\nnot markup at all\n```";
        let out = html_css(raw);
        assert!(out.html.starts_with("<html><body><p>```html"));
    }

    #[test]
    fn test_raw_markup_passes_through() {
        let raw = "  <div><span>Tailwind</span></div>\n";
        let out = parse(raw, OutputFormat::Tailwind);
        assert_eq!(out.html, "<div><span>Tailwind</span></div>");
        assert_eq!(out.css, "");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let raw = "```CSS\na{}\n```\n<BODY>Link</BODY>";
        let out = html_css(raw);
        assert_eq!(out.css, "a{}");
        assert_eq!(out.html, "<style>a{}</style>\nLink");
    }

    #[test]
    fn test_fenced_css_beats_style_tag() {
        let raw = "<style>.a{}</style>\n```css\n.b{}\n```";
        assert_eq!(html_css(raw).css, ".b{}");
    }

    #[test]
    fn test_format_does_not_change_extraction() {
        let raw = "<body>Same</body>\n<style>.x{}</style>";
        assert_eq!(
            parse(raw, OutputFormat::HtmlCss),
            parse(raw, OutputFormat::Tailwind)
        );
    }

    #[test]
    fn test_empty_reply() {
        let out = html_css("   ");
        assert_eq!(out.html, "<html><body><p></p></body></html>");
        assert_eq!(out.css, "");
    }
}
