//! Link syntax shared by every dialect: `[[Target]]`, `[[Target|text]]`
//! and bare WikiWords such as `HomePage`.

use super::{html_escape, RenderContext};
use regex::Regex;
use std::sync::OnceLock;

static WIKI_WORD_REGEX: OnceLock<Regex> = OnceLock::new();

fn wiki_word() -> &'static Regex {
    WIKI_WORD_REGEX.get_or_init(|| {
        Regex::new(r"\b[A-Z]+[a-z]+[A-Z][A-Za-z0-9]*\b").expect("valid wiki word regex")
    })
}

/// A piece of scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Link { target: &'a str, display: &'a str },
}

/// Split `text` into literal runs and links.
///
/// Malformed bracket links stay literal. A backslash directly in front of a
/// WikiWord keeps the word literal and is itself dropped. With
/// `brackets_only` set, WikiWords are never links.
pub fn scan(text: &str, brackets_only: bool) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while cursor < text.len() {
        let bracket = text[cursor..].find("[[").map(|i| cursor + i);
        let word = if brackets_only {
            None
        } else {
            wiki_word().find_at(text, cursor)
        };

        match (bracket, word) {
            (Some(b), w) if w.map_or(true, |w| b < w.start()) => {
                match parse_bracket(&text[b + 2..]) {
                    Some((target, display, consumed)) => {
                        push_text(&mut segments, &text[literal_start..b]);
                        segments.push(Segment::Link { target, display });
                        cursor = b + 2 + consumed;
                        literal_start = cursor;
                    }
                    None => cursor = b + 2,
                }
            }
            (_, Some(w)) => {
                if w.start() > 0 && text.as_bytes()[w.start() - 1] == b'\\' {
                    push_text(&mut segments, &text[literal_start..w.start() - 1]);
                    push_text(&mut segments, w.as_str());
                } else {
                    push_text(&mut segments, &text[literal_start..w.start()]);
                    segments.push(Segment::Link {
                        target: w.as_str(),
                        display: w.as_str(),
                    });
                }
                cursor = w.end();
                literal_start = cursor;
            }
            _ => break,
        }
    }

    push_text(&mut segments, &text[literal_start..]);
    segments
}

/// Parse the inside of a bracket link, `rest` starting right after `[[`.
///
/// Returns target, display text and the number of bytes consumed including
/// the closing `]]`.
fn parse_bracket(rest: &str) -> Option<(&str, &str, usize)> {
    let end = rest.find("]]")?;
    let inner = &rest[..end];
    if inner.contains("[[") || inner.contains('\n') {
        return None;
    }

    let (target, display) = match inner.split_once('|') {
        Some((target, display)) => (target.trim(), display.trim()),
        None => (inner.trim(), inner.trim()),
    };
    if target.is_empty() {
        return None;
    }

    let display = if display.is_empty() { target } else { display };
    Some((target, display, end + 2))
}

fn push_text<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
}

/// Record `target` unless it was already seen.
pub fn collect_link(links: &mut Vec<String>, target: &str) {
    if !links.iter().any(|l| l == target) {
        links.push(target.to_string());
    }
}

/// HTML for a link, marking targets that have no page yet.
pub fn render_link(target: &str, display: &str, ctx: &RenderContext<'_>) -> String {
    let href = html_escape(&ctx.page_href(target));
    let display = html_escape(display);
    if ctx.page_exists(target) {
        format!(r#"<a class="existingWikiWord" href="{href}">{display}</a>"#)
    } else {
        format!(r#"<span class="newWikiWord">{display}<a href="{href}">?</a></span>"#)
    }
}
