//! Plain text dialect: paragraphs and wiki links, nothing else.

use super::categories::{extract_categories, render_category_block};
use super::wikilinks::{collect_link, render_link, scan, Segment};
use super::{html_escape, MarkupKind, MarkupProcessor, ParsedContent, RenderContext};

/// Text is escaped, blank lines separate paragraphs and single newlines
/// become line breaks.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainProcessor;

impl MarkupProcessor for PlainProcessor {
    fn kind(&self) -> MarkupKind {
        MarkupKind::Plain
    }

    fn parse(&self, content: &str, ctx: &RenderContext<'_>) -> ParsedContent {
        let (body, categories) = extract_categories(content, false);
        let body = body.replace("\r\n", "\n");
        let mut links = Vec::new();
        let mut rendered = String::new();

        for paragraph in body.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            rendered.push_str("<p>");
            for (i, line) in paragraph.lines().enumerate() {
                if i > 0 {
                    rendered.push_str("<br/>\n");
                }
                for segment in scan(line, ctx.brackets_only()) {
                    match segment {
                        Segment::Text(text) => rendered.push_str(&html_escape(text)),
                        Segment::Link { target, display } => {
                            collect_link(&mut links, target);
                            rendered.push_str(&render_link(target, display, ctx));
                        }
                    }
                }
            }
            rendered.push_str("</p>\n");
        }

        rendered.push_str(&render_category_block(&categories, ctx));

        ParsedContent {
            rendered,
            categories,
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParsedContent {
        PlainProcessor.parse(content, &RenderContext::detached(false))
    }

    #[test]
    fn test_paragraphs_and_breaks() {
        let parsed = parse("first line\nsecond line\n\n\nnext paragraph");
        assert_eq!(
            parsed.rendered,
            "<p>first line<br/>\nsecond line</p>\n<p>next paragraph</p>\n"
        );
    }

    #[test]
    fn test_markup_is_escaped() {
        let parsed = parse("<b>bold</b> & **not markdown**");
        assert_eq!(
            parsed.rendered,
            "<p>&lt;b&gt;bold&lt;/b&gt; &amp; **not markdown**</p>\n"
        );
    }

    #[test]
    fn test_links_and_categories() {
        let parsed = parse("Climb [[Oak]] near ElephantHouse.\ncategory: trees");
        assert_eq!(parsed.links, vec!["Oak", "ElephantHouse"]);
        assert!(parsed.categories.contains("trees"));
        assert!(parsed.rendered.contains(r#"<span class="newWikiWord">Oak"#));
        assert!(parsed.rendered.contains(r#"<div class="property">category: "#));
    }

    #[test]
    fn test_backticks_do_not_hide_categories() {
        let parsed = parse("```\nnot a code block\ncategory: trees");
        assert!(parsed.categories.contains("trees"));
        assert!(!parsed.rendered.contains("category: trees"));
    }

    #[test]
    fn test_empty_content() {
        let parsed = parse("");
        assert!(parsed.rendered.is_empty());
        assert!(parsed.links.is_empty());
    }
}
