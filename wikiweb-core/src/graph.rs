//! Inverse link index over a web's pages.

use crate::page::Page;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Link graph between pages, keyed by page name.
///
/// Built from the current revisions whenever it is needed; nothing is
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinkGraph {
    /// Map from page name to the pages it links to
    pub outgoing: HashMap<String, Vec<String>>,

    /// Map from page name to the pages linking to it
    pub incoming: HashMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Self {
        let mut graph = Self::new();
        for page in pages {
            graph.outgoing.entry(page.name().to_string()).or_default();
            for target in page.outgoing_links() {
                graph.add_link(page.name(), target);
            }
        }
        graph
    }

    /// Add a link from source to target
    pub fn add_link(&mut self, source: &str, target: &str) {
        let out = self.outgoing.entry(source.to_string()).or_default();
        if !out.iter().any(|t| t == target) {
            out.push(target.to_string());
        }

        if source == target {
            return;
        }
        let sources = self.incoming.entry(target.to_string()).or_default();
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }

    /// Names of the pages linking to `name`, sorted
    pub fn referenced_by(&self, name: &str) -> Vec<String> {
        let mut sources = self.incoming.get(name).cloned().unwrap_or_default();
        sources.sort();
        sources
    }

    pub fn outgoing(&self, name: &str) -> Vec<String> {
        self.outgoing.get(name).cloned().unwrap_or_default()
    }

    pub fn is_referenced(&self, name: &str) -> bool {
        self.incoming.get(name).is_some_and(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_graph() {
        let mut graph = LinkGraph::new();
        graph.add_link("HomePage", "Oak");
        graph.add_link("HomePage", "Elephant");
        graph.add_link("Pine", "Oak");

        assert_eq!(graph.outgoing("HomePage").len(), 2);
        assert_eq!(graph.referenced_by("Oak"), vec!["HomePage", "Pine"]);
        assert!(graph.is_referenced("Elephant"));
        assert!(!graph.is_referenced("Pine"));
        assert!(graph.outgoing("Missing").is_empty());
    }

    #[test]
    fn test_self_links_and_duplicates() {
        let mut graph = LinkGraph::new();
        graph.add_link("Oak", "Oak");
        graph.add_link("Pine", "Oak");
        graph.add_link("Pine", "Oak");

        assert_eq!(graph.outgoing("Oak"), vec!["Oak"]);
        assert_eq!(graph.referenced_by("Oak"), vec!["Pine"]);
    }
}
