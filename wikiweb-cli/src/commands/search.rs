//! Search command implementation

use super::open_wiki;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct SearchResult {
    name: String,
    name_match: bool,
    snippet: String,
    categories: Vec<String>,
}

/// Search a web's pages by regular expression
pub fn search_web(config_path: &Path, web: &str, query: &str, json: bool) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    let engine = wiki.search_engine();
    let results = wiki.with_web(web, |w| {
        engine
            .hits(w, query)
            .into_iter()
            .map(|hit| SearchResult {
                name: hit.page.name().to_string(),
                name_match: hit.name_match,
                snippet: hit.snippet,
                categories: hit.page.categories().iter().cloned().collect(),
            })
            .collect::<Vec<_>>()
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for '{}'", query);
        return Ok(());
    }

    for result in &results {
        if result.snippet.is_empty() {
            println!("{}", result.name);
        } else {
            println!("{}: {}", result.name, result.snippet);
        }
    }
    Ok(())
}
