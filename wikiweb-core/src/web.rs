//! A web: an independent namespace of pages with its own settings.

use crate::error::{Result, WikiError};
use crate::graph::LinkGraph;
use crate::markup::{Markup, MarkupKind, RenderContext};
use crate::models::{default_lock_timeout, Author, Revision};
use crate::page::{Edit, Page};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

fn default_color() -> String {
    "008B26".to_string()
}

fn default_home_page() -> String {
    "HomePage".to_string()
}

/// Per-web options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSettings {
    /// Password guarding the web; `None` or empty falls back to the system default
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub markup: MarkupKind,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub additional_style: String,

    /// Escape raw HTML in page content
    #[serde(default)]
    pub safe_mode: bool,

    #[serde(default)]
    pub published: bool,

    /// Only `[[...]]` makes a link; bare WikiWords stay text
    #[serde(default)]
    pub brackets_only: bool,

    #[serde(default = "default_true")]
    pub count_pages: bool,

    #[serde(default = "default_home_page")]
    pub home_page: String,
}

fn default_true() -> bool {
    true
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            password: None,
            markup: MarkupKind::default(),
            color: default_color(),
            additional_style: String::new(),
            safe_mode: false,
            published: false,
            brackets_only: false,
            count_pages: true,
            home_page: default_home_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Web {
    address: String,
    name: String,

    #[serde(default)]
    settings: WebSettings,

    /// Pages in insertion order
    #[serde(default)]
    pages: Vec<Page>,

    #[serde(skip)]
    index: HashMap<String, usize>,

    #[serde(skip)]
    markup: Markup,

    #[serde(skip, default = "default_lock_timeout")]
    lock_timeout: Duration,
}

impl Web {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_settings(address, name, WebSettings::default())
    }

    pub fn with_settings(
        address: impl Into<String>,
        name: impl Into<String>,
        settings: WebSettings,
    ) -> Self {
        let markup = Markup::new(settings.markup, settings.brackets_only);
        Self {
            address: address.into(),
            name: name.into(),
            settings,
            pages: Vec::new(),
            index: HashMap::new(),
            markup,
            lock_timeout: default_lock_timeout(),
        }
    }

    /// Rebuild everything that is not stored after loading.
    ///
    /// Stored pages without revisions are dropped, a repeated page name keeps
    /// its first copy and revision numbers are reset to their positions.
    pub fn hydrate(&mut self, lock_timeout: Duration) {
        let before = self.pages.len();
        self.pages.retain(Page::has_revisions);
        if self.pages.len() != before {
            warn!(
                web = %self.address,
                dropped = before - self.pages.len(),
                "Dropped stored pages without revisions"
            );
        }

        let mut seen = HashSet::new();
        let before = self.pages.len();
        self.pages.retain(|page| seen.insert(page.name().to_string()));
        if self.pages.len() != before {
            warn!(
                web = %self.address,
                dropped = before - self.pages.len(),
                "Dropped stored pages with duplicate names"
            );
        }

        for page in &mut self.pages {
            if page.renumber_revisions() {
                warn!(web = %self.address, page = page.name(), "Renumbered stored revisions");
            }
        }

        self.markup = Markup::new(self.settings.markup, self.settings.brackets_only);
        for page in &mut self.pages {
            page.refresh_metadata(&self.markup);
        }
        self.set_lock_timeout(lock_timeout);
        self.rebuild_index();
    }

    pub fn set_lock_timeout(&mut self, timeout: Duration) {
        self.lock_timeout = timeout;
        for page in &mut self.pages {
            page.set_lock_timeout(timeout);
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| (page.name().to_string(), i))
            .collect();
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &WebSettings {
        &self.settings
    }

    pub fn markup(&self) -> &Markup {
        &self.markup
    }

    pub fn home_page(&self) -> &str {
        &self.settings.home_page
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn has_page(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn page_names(&self) -> Vec<&str> {
        self.pages.iter().map(Page::name).collect()
    }

    /// Write `content` as `author`, creating the page on first write.
    pub fn write_page(
        &mut self,
        name: &str,
        content: impl Into<String>,
        author: Author,
        at: DateTime<Utc>,
    ) -> Result<&Revision> {
        self.write_page_with(name, Edit::new(content, author, at))
    }

    pub fn write_page_with(&mut self, name: &str, edit: Edit) -> Result<&Revision> {
        match self.index.get(name) {
            Some(&i) => {
                debug!(web = %self.address, page = name, author = %edit.author, "Appending revision");
                let page = &mut self.pages[i];
                match page.write(edit, &self.markup) {
                    Ok(revision) => Ok(revision),
                    Err(err) => {
                        warn!(web = %self.address, page = name, "Write rejected: {}", err);
                        Err(err)
                    }
                }
            }
            None => {
                debug!(web = %self.address, page = name, author = %edit.author, "Creating page");
                let mut page = Page::create(name, edit, &self.markup);
                page.set_lock_timeout(self.lock_timeout);
                self.index.insert(name.to_string(), self.pages.len());
                self.pages.push(page);
                let page = &self.pages[self.pages.len() - 1];
                Ok(page.current_revision())
            }
        }
    }

    pub fn read_page(&self, name: &str) -> Result<&Page> {
        self.index
            .get(name)
            .map(|&i| &self.pages[i])
            .ok_or_else(|| self.page_not_found(name))
    }

    pub fn page_mut(&mut self, name: &str) -> Result<&mut Page> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.pages[i]),
            None => Err(self.page_not_found(name)),
        }
    }

    fn page_not_found(&self, name: &str) -> WikiError {
        WikiError::PageNotFound {
            web: self.address.clone(),
            page: name.to_string(),
        }
    }

    pub fn lock_page(&mut self, name: &str, at: DateTime<Utc>, holder: &str) -> Result<()> {
        self.page_mut(name)?.lock(at, holder);
        Ok(())
    }

    pub fn unlock_page(&mut self, name: &str) -> Result<()> {
        self.page_mut(name)?.unlock();
        Ok(())
    }

    /// Pages matching `predicate`, in insertion order
    pub fn select<F>(&self, predicate: F) -> Vec<&Page>
    where
        F: Fn(&Page) -> bool,
    {
        self.pages.iter().filter(|page| predicate(page)).collect()
    }

    pub fn select_all(&self) -> Vec<&Page> {
        self.pages.iter().collect()
    }

    pub fn pages_in_category(&self, category: &str) -> Vec<&Page> {
        self.select(|page| page.in_category(category))
    }

    /// Every category used by a current revision, sorted
    pub fn categories(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|page| page.categories().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Most recently revised first; ties by name
    pub fn pages_by_revision(&self, limit: Option<usize>) -> Vec<&Page> {
        let mut pages = self.select_all();
        pages.sort_by(|a, b| {
            b.revised_at()
                .cmp(&a.revised_at())
                .then_with(|| a.name().cmp(b.name()))
        });
        if let Some(limit) = limit {
            pages.truncate(limit);
        }
        pages
    }

    /// Names of everyone who wrote a revision, sorted
    pub fn authors(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|page| page.revisions().iter().map(|r| r.author().name.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn link_graph(&self) -> LinkGraph {
        LinkGraph::from_pages(&self.pages)
    }

    pub fn referenced_by(&self, name: &str) -> Vec<String> {
        self.link_graph().referenced_by(name)
    }

    /// Pages other than the home page that nothing links to, by name
    pub fn orphaned_pages(&self) -> Vec<&Page> {
        let graph = self.link_graph();
        let mut orphans = self.select(|page| {
            page.name() != self.settings.home_page && !graph.is_referenced(page.name())
        });
        orphans.sort_by(|a, b| a.name().cmp(b.name()));
        orphans
    }

    /// Link targets that have no page yet, sorted
    pub fn wanted_pages(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|page| page.outgoing_links().iter())
            .filter(|target| !self.has_page(target))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Remove one generation of orphans.
    ///
    /// References are taken from the graph before anything is removed, so a
    /// page only referenced by a removed orphan survives until the next pass.
    pub fn remove_orphaned_pages(&mut self) -> Vec<Page> {
        let graph = self.link_graph();
        let home = self.settings.home_page.clone();

        let (kept, removed): (Vec<Page>, Vec<Page>) = std::mem::take(&mut self.pages)
            .into_iter()
            .partition(|page| page.name() == home || graph.is_referenced(page.name()));

        self.pages = kept;
        self.rebuild_index();

        if !removed.is_empty() {
            debug!(
                web = %self.address,
                removed = ?removed.iter().map(Page::name).collect::<Vec<_>>(),
                "Removed orphaned pages"
            );
        }
        removed
    }

    pub fn remove_page(&mut self, name: &str) -> Result<Page> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| self.page_not_found(name))?;
        let page = self.pages.remove(i);
        self.rebuild_index();
        debug!(web = %self.address, page = name, "Removed page");
        Ok(page)
    }

    /// Check `password` against the web password, or `fallback` when the web
    /// has none.
    pub fn authenticate(&self, password: &str, fallback: &str) -> bool {
        match self.settings.password.as_deref().filter(|p| !p.is_empty()) {
            Some(expected) => expected == password,
            None => fallback == password,
        }
    }

    pub fn update_settings(&mut self, settings: WebSettings) {
        let relink = settings.markup != self.settings.markup
            || settings.brackets_only != self.settings.brackets_only;
        self.settings = settings;

        if relink {
            self.markup = Markup::new(self.settings.markup, self.settings.brackets_only);
            for page in &mut self.pages {
                page.refresh_metadata(&self.markup);
            }
        }
    }

    pub(crate) fn rename(&mut self, address: impl Into<String>, name: impl Into<String>) {
        self.address = address.into();
        self.name = name.into();
    }

    /// HTML of the current revision of `name`
    pub fn render_page(&self, name: &str) -> Result<String> {
        let page = self.read_page(name)?;
        Ok(self.render_content(page.content()))
    }

    pub fn render_revision(&self, name: &str, index: usize) -> Result<String> {
        let revision = self.read_page(name)?.revision(index)?;
        Ok(self.render_content(revision.content()))
    }

    fn render_content(&self, content: &str) -> String {
        let base_url = format!("/{}", self.address);
        let exists = |name: &str| self.has_page(name);
        let ctx = RenderContext::new(&base_url, &exists)
            .with_brackets_only(self.settings.brackets_only)
            .with_safe_mode(self.settings.safe_mode);
        self.markup.render(content, &ctx).rendered
    }
}
