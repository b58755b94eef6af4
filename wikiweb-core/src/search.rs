//! Pattern search over the pages of a web.

use crate::config::SearchConfig;
use crate::page::Page;
use crate::web::Web;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// One search result with a preview of where it matched
#[derive(Debug, Clone)]
pub struct SearchHit<'w> {
    pub page: &'w Page,
    /// The query matched the page name
    pub name_match: bool,
    /// Text around the first match in the content, empty if only the name matched
    pub snippet: String,
}

#[derive(Debug, Clone)]
pub struct SearchEngine {
    max_query_len: usize,
    snippet_len: usize,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::with_config(&SearchConfig::default())
    }

    pub fn with_config(config: &SearchConfig) -> Self {
        Self {
            max_query_len: config.max_query_len,
            snippet_len: config.snippet_len,
        }
    }

    /// Pages whose name or current content match `query`, by name.
    ///
    /// The query is a case-insensitive regular expression; a query that is
    /// not a valid expression is matched literally. A blank query matches
    /// nothing.
    pub fn search<'w>(&self, web: &'w Web, query: &str) -> Vec<&'w Page> {
        self.hits(web, query).into_iter().map(|hit| hit.page).collect()
    }

    pub fn hits<'w>(&self, web: &'w Web, query: &str) -> Vec<SearchHit<'w>> {
        let Some(pattern) = self.compile(query) else {
            return Vec::new();
        };

        let mut hits: Vec<SearchHit<'w>> = web
            .select_all()
            .into_iter()
            .filter_map(|page| {
                let name_match = pattern.is_match(page.name());
                let snippet = self.snippet(&pattern, page.content());
                (name_match || snippet.is_some()).then(|| SearchHit {
                    page,
                    name_match,
                    snippet: snippet.unwrap_or_default(),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.page.name().cmp(b.page.name()));

        debug!(web = web.address(), query, hits = hits.len(), "Search finished");
        hits
    }

    fn compile(&self, query: &str) -> Option<Regex> {
        let query: String = query.chars().take(self.max_query_len).collect();
        if query.trim().is_empty() {
            return None;
        }

        match RegexBuilder::new(&query).case_insensitive(true).build() {
            Ok(re) => Some(re),
            Err(err) => {
                warn!(query = %query, "Invalid search pattern, matching literally: {}", err);
                RegexBuilder::new(&regex::escape(&query))
                    .case_insensitive(true)
                    .build()
                    .ok()
            }
        }
    }

    fn snippet(&self, pattern: &Regex, content: &str) -> Option<String> {
        pattern.find(content)?;

        let text = content.split_whitespace().collect::<Vec<_>>().join(" ");
        let start = match pattern.find(&text) {
            Some(m) => m.start(),
            // The match spanned collapsed whitespace
            None => 0,
        };

        let lead = self.snippet_len / 4;
        let mut begin = text[..start]
            .char_indices()
            .rev()
            .nth(lead.saturating_sub(1))
            .map_or(0, |(i, _)| i);
        if begin > 0 {
            begin = text[begin..].find(' ').map_or(begin, |i| begin + i + 1);
        }

        let snippet = create_snippet(&text[begin..], self.snippet_len);
        Some(if begin > 0 {
            format!("...{}", snippet)
        } else {
            snippet
        })
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn create_snippet(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    // Find last space within limit
    let truncated: String = chars[..max_chars].iter().collect();
    if let Some(last_space) = truncated.rfind(' ') {
        format!("{}...", &truncated[..last_space])
    } else {
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;
    use chrono::Utc;

    fn fixture() -> Web {
        let mut web = Web::new("wiki1", "Wiki1");
        let guest = Author::new("Guest", "127.0.0.1");
        let now = Utc::now();
        web.write_page("HomePage", "Home of the wiki", guest.clone(), now)
            .unwrap();
        web.write_page("Oak", "All about oak.\ncategory: trees", guest.clone(), now)
            .unwrap();
        web.write_page("Elephant", "All about elephants.", guest, now)
            .unwrap();
        web
    }

    fn names(pages: Vec<&Page>) -> Vec<&str> {
        pages.into_iter().map(Page::name).collect()
    }

    #[test]
    fn test_results_are_name_ordered() {
        let web = fixture();
        let engine = SearchEngine::new();
        assert_eq!(names(engine.search(&web, "All about")), vec!["Elephant", "Oak"]);
    }

    #[test]
    fn test_regex_query() {
        let web = fixture();
        let engine = SearchEngine::new();
        assert_eq!(names(engine.search(&web, r"\s[A-Z]ak")), vec!["Oak"]);
    }

    #[test]
    fn test_invalid_regex_matches_literally() {
        let mut web = fixture();
        web.write_page("Brackets", "costs [1 dollar", Author::new("Guest", "x"), Utc::now())
            .unwrap();
        let engine = SearchEngine::new();
        assert_eq!(names(engine.search(&web, "[1")), vec!["Brackets"]);
    }

    #[test]
    fn test_blank_and_missing() {
        let web = fixture();
        let engine = SearchEngine::new();
        assert!(engine.search(&web, "").is_empty());
        assert!(engine.search(&web, "   ").is_empty());
        assert!(engine.search(&web, "giraffe").is_empty());
    }

    #[test]
    fn test_name_match_without_content() {
        let web = fixture();
        let hits = SearchEngine::new().hits(&web, "homepage");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].name_match);
        assert!(hits[0].snippet.is_empty());
    }

    #[test]
    fn test_query_is_truncated() {
        let web = fixture();
        let engine = SearchEngine::with_config(&SearchConfig {
            max_query_len: 3,
            ..SearchConfig::default()
        });
        assert_eq!(names(engine.search(&web, "Elephantine")), vec!["Elephant"]);
    }

    #[test]
    fn test_snippet_centres_on_match() {
        let mut web = Web::new("wiki1", "Wiki1");
        let text = format!("{} needle {}", "word ".repeat(100), "tail ".repeat(100));
        web.write_page("Long", text, Author::new("Guest", "x"), Utc::now())
            .unwrap();

        let hits = SearchEngine::new().hits(&web, "needle");
        let snippet = &hits[0].snippet;
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("needle"));
    }

    #[test]
    fn test_create_snippet() {
        assert_eq!(create_snippet("short", 10), "short");
        assert_eq!(create_snippet("one two three", 9), "one two...");
    }
}
