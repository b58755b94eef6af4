//! Markdown dialect built on pulldown-cmark.

use super::categories::{extract_categories, render_category_block};
use super::wikilinks::{collect_link, render_link, scan, Segment};
use super::{MarkupKind, MarkupProcessor, ParsedContent, RenderContext};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Markdown processor with wiki link extensions
pub struct MarkdownProcessor {
    options: Options,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self { options }
    }

    /// Convert markdown to HTML without any surrounding web
    pub fn convert_simple(&self, markdown: &str) -> String {
        self.parse(markdown, &RenderContext::detached(false)).rendered
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupProcessor for MarkdownProcessor {
    fn kind(&self) -> MarkupKind {
        MarkupKind::Markdown
    }

    fn parse(&self, content: &str, ctx: &RenderContext<'_>) -> ParsedContent {
        let (body, categories) = extract_categories(content, true);

        let events: Vec<Event> = Parser::new_ext(&body, self.options).collect();
        let events = if ctx.safe_mode() {
            neutralize_html(events)
        } else {
            events
        };
        let (events, links) = transform_links(events, ctx);

        let mut rendered = String::new();
        html::push_html(&mut rendered, events.into_iter());
        rendered.push_str(&render_category_block(&categories, ctx));

        ParsedContent {
            rendered,
            categories,
            links,
        }
    }
}

/// Raw HTML from the author is shown as text.
fn neutralize_html(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    events
        .into_iter()
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        })
        .collect()
}

/// Replace link syntax in text runs with link markup.
///
/// Consecutive text events are merged first since the parser splits
/// `[[Target]]` at each bracket. Text inside code blocks, links and images
/// is left alone.
fn transform_links<'a>(
    events: Vec<Event<'a>>,
    ctx: &RenderContext<'_>,
) -> (Vec<Event<'a>>, Vec<String>) {
    let mut result = Vec::with_capacity(events.len());
    let mut links = Vec::new();
    let mut verbatim_depth = 0usize;
    let mut events = events.into_iter().peekable();

    while let Some(event) = events.next() {
        match event {
            Event::Start(tag @ (Tag::CodeBlock(_) | Tag::Link { .. } | Tag::Image { .. })) => {
                verbatim_depth += 1;
                result.push(Event::Start(tag));
            }
            Event::End(end @ (TagEnd::CodeBlock | TagEnd::Link | TagEnd::Image)) => {
                verbatim_depth = verbatim_depth.saturating_sub(1);
                result.push(Event::End(end));
            }
            Event::Text(text) if verbatim_depth == 0 => {
                let mut merged = text.into_string();
                while let Some(Event::Text(next)) = events.peek() {
                    merged.push_str(next);
                    events.next();
                }

                for segment in scan(&merged, ctx.brackets_only()) {
                    match segment {
                        Segment::Text(text) => result.push(Event::Text(boxed(text))),
                        Segment::Link { target, display } => {
                            collect_link(&mut links, target);
                            result.push(Event::InlineHtml(boxed(&render_link(
                                target, display, ctx,
                            ))));
                        }
                    }
                }
            }
            other => result.push(other),
        }
    }

    (result, links)
}

fn boxed(text: &str) -> CowStr<'static> {
    CowStr::Boxed(text.to_string().into_boxed_str())
}
