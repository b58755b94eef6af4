//! Markup dialects and the page metadata derived from them.
//!
//! Every dialect implements [`MarkupProcessor`]: it turns raw page content
//! into rendered HTML plus two derived facts, the category tags and the
//! outgoing page links. Only the derived facts feed back into the page model;
//! the rendered output belongs to the presentation layer.

pub mod categories;
pub mod markdown;
pub mod plain;
pub mod wikilinks;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub use markdown::MarkdownProcessor;
pub use plain::PlainProcessor;

/// Supported markup dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    #[default]
    Markdown,
    Plain,
}

impl MarkupKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Some(MarkupKind::Markdown),
            "plain" | "text" => Some(MarkupKind::Plain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkupKind::Markdown => "markdown",
            MarkupKind::Plain => "plain",
        }
    }
}

impl fmt::Display for MarkupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn no_pages(_: &str) -> bool {
    false
}

static NO_PAGES: fn(&str) -> bool = no_pages;

/// Everything a dialect needs to know about the surrounding web
pub struct RenderContext<'a> {
    base_url: &'a str,
    brackets_only: bool,
    safe_mode: bool,
    page_exists: &'a dyn Fn(&str) -> bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(base_url: &'a str, page_exists: &'a dyn Fn(&str) -> bool) -> Self {
        Self {
            base_url,
            brackets_only: false,
            safe_mode: false,
            page_exists,
        }
    }

    /// Context for metadata extraction, where no page is known to exist.
    pub fn detached(brackets_only: bool) -> RenderContext<'static> {
        RenderContext {
            base_url: "",
            brackets_only,
            safe_mode: false,
            page_exists: &NO_PAGES,
        }
    }

    pub fn with_brackets_only(mut self, brackets_only: bool) -> Self {
        self.brackets_only = brackets_only;
        self
    }

    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    pub fn brackets_only(&self) -> bool {
        self.brackets_only
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn page_exists(&self, name: &str) -> bool {
        (self.page_exists)(name)
    }

    /// Link to a page's show view under the web's base URL
    pub fn page_href(&self, name: &str) -> String {
        format!(
            "{}/show/{}",
            self.base_url.trim_end_matches('/'),
            encode_path_segment(name)
        )
    }

    /// Link to the category listing of the web
    pub fn category_href(&self, category: &str) -> String {
        format!(
            "{}/list?category={}",
            self.base_url.trim_end_matches('/'),
            encode_path_segment(category)
        )
    }
}

/// Output of a dialect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedContent {
    pub rendered: String,
    pub categories: BTreeSet<String>,
    /// Link targets in first-seen order, without duplicates
    pub links: Vec<String>,
}

/// The derived facts of a piece of content, without the rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub categories: BTreeSet<String>,
    pub links: Vec<String>,
}

impl From<ParsedContent> for PageMetadata {
    fn from(parsed: ParsedContent) -> Self {
        Self {
            categories: parsed.categories,
            links: parsed.links,
        }
    }
}

/// A markup dialect
pub trait MarkupProcessor: Send + Sync {
    fn kind(&self) -> MarkupKind;

    /// Render `content` and derive its categories and links.
    ///
    /// Must never fail: malformed syntax degrades to literal text.
    fn parse(&self, content: &str, ctx: &RenderContext<'_>) -> ParsedContent;
}

/// Processor implementing `kind`
pub fn processor_for(kind: MarkupKind) -> Arc<dyn MarkupProcessor> {
    match kind {
        MarkupKind::Markdown => Arc::new(MarkdownProcessor::new()),
        MarkupKind::Plain => Arc::new(PlainProcessor),
    }
}

/// A web's markup setup: the dialect plus the link options that change
/// what counts as a link.
#[derive(Clone)]
pub struct Markup {
    processor: Arc<dyn MarkupProcessor>,
    brackets_only: bool,
}

impl Markup {
    pub fn new(kind: MarkupKind, brackets_only: bool) -> Self {
        Self::with_processor(processor_for(kind), brackets_only)
    }

    /// Use a custom dialect implementation.
    pub fn with_processor(processor: Arc<dyn MarkupProcessor>, brackets_only: bool) -> Self {
        Self {
            processor,
            brackets_only,
        }
    }

    pub fn kind(&self) -> MarkupKind {
        self.processor.kind()
    }

    pub fn brackets_only(&self) -> bool {
        self.brackets_only
    }

    pub fn metadata(&self, content: &str) -> PageMetadata {
        self.processor
            .parse(content, &RenderContext::detached(self.brackets_only))
            .into()
    }

    pub fn render(&self, content: &str, ctx: &RenderContext<'_>) -> ParsedContent {
        self.processor.parse(content, ctx)
    }
}

impl Default for Markup {
    fn default() -> Self {
        Self::new(MarkupKind::default(), false)
    }
}

impl fmt::Debug for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Markup")
            .field("kind", &self.kind())
            .field("brackets_only", &self.brackets_only)
            .finish()
    }
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_kind_conversion() {
        assert_eq!(MarkupKind::from_str("markdown"), Some(MarkupKind::Markdown));
        assert_eq!(MarkupKind::from_str("PLAIN"), Some(MarkupKind::Plain));
        assert_eq!(MarkupKind::from_str("textile"), None);
        assert_eq!(MarkupKind::Plain.as_str(), "plain");
    }

    #[test]
    fn test_page_href_encoding() {
        let exists = |_: &str| true;
        let ctx = RenderContext::new("/wiki1/", &exists);
        assert_eq!(ctx.page_href("HomePage"), "/wiki1/show/HomePage");
        assert_eq!(ctx.page_href("Big Trees"), "/wiki1/show/Big%20Trees");
        assert_eq!(ctx.category_href("trees"), "/wiki1/list?category=trees");
    }

    #[test]
    fn test_detached_context_knows_no_pages() {
        let ctx = RenderContext::detached(true);
        assert!(!ctx.page_exists("HomePage"));
        assert!(ctx.brackets_only());
    }

    #[test]
    fn test_metadata_follows_dialect() {
        let content = "See [[Oak]] and HomePage.\ncategory: trees";
        for kind in [MarkupKind::Markdown, MarkupKind::Plain] {
            let meta = Markup::new(kind, false).metadata(content);
            assert_eq!(meta.links, vec!["Oak", "HomePage"], "{kind}");
            assert!(meta.categories.contains("trees"), "{kind}");

            let bracketed = Markup::new(kind, true).metadata(content);
            assert_eq!(bracketed.links, vec!["Oak"], "{kind}");
        }
    }
}
