//! Category declarations embedded in page content.
//!
//! A line of the form `category: trees, plants` tags the page. The line is
//! removed from the rendered body and the tags are listed in a block at the
//! end instead.
//!
//! ```
//! use wikiweb_core::markup::categories::extract_categories;
//!
//! let (body, cats) = extract_categories("Tall things.\ncategories: trees, plants\n", true);
//! assert_eq!(body, "Tall things.\n");
//! assert_eq!(cats.into_iter().collect::<Vec<_>>(), vec!["plants", "trees"]);
//! ```

use super::{html_escape, RenderContext};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static CATEGORY_REGEX: OnceLock<Regex> = OnceLock::new();

fn category_regex() -> &'static Regex {
    CATEGORY_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^\s*categor(?:y|ies)\s*:\s*(.*)$").expect("valid category regex")
    })
}

/// Opening marker of a fenced code block, if `line` starts one
fn fence_marker(line: &str) -> Option<&'static str> {
    let line = line.trim_start();
    ["```", "~~~"].into_iter().find(|m| line.starts_with(m))
}

/// Split `content` into the body without category lines and the set of tags.
///
/// With `fences` set, lines inside ```` ``` ```` or `~~~` code blocks are
/// never treated as declarations. A block closes only on its own marker.
pub fn extract_categories(content: &str, fences: bool) -> (String, BTreeSet<String>) {
    let mut body = String::with_capacity(content.len());
    let mut categories = BTreeSet::new();
    let mut open_fence: Option<&str> = None;

    for line in content.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);

        if fences {
            match (open_fence, fence_marker(bare)) {
                (None, Some(marker)) => open_fence = Some(marker),
                (Some(open), Some(marker)) if open == marker => open_fence = None,
                _ => {}
            }
        }

        if open_fence.is_none() {
            if let Some(caps) = category_regex().captures(bare) {
                let tags = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                categories.extend(
                    tags.split(|c: char| c == ',' || c.is_whitespace())
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string),
                );
                continue;
            }
        }

        body.push_str(line);
    }

    (body, categories)
}

/// HTML block listing the categories with links to their listings.
///
/// Empty when there are no categories.
pub fn render_category_block(categories: &BTreeSet<String>, ctx: &RenderContext<'_>) -> String {
    if categories.is_empty() {
        return String::new();
    }

    let links = categories
        .iter()
        .map(|c| {
            format!(
                r#"<a class="category_link" href="{}">{}</a>"#,
                html_escape(&ctx.category_href(c)),
                html_escape(c)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("<div class=\"property\">category: {}</div>\n", links)
}
