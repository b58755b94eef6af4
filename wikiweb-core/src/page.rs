//! A named page: its revision history and the advisory edit lock.

use crate::error::{Result, WikiError};
use crate::markup::{Markup, PageMetadata};
use crate::models::{default_lock_timeout, Author, Lock, Revision};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A request to write new content to a page
#[derive(Debug, Clone)]
pub struct Edit {
    pub content: String,
    pub author: Author,
    pub at: DateTime<Utc>,
    /// Write even if someone else holds the lock
    pub break_lock: bool,
}

impl Edit {
    pub fn new(content: impl Into<String>, author: Author, at: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            author,
            at,
            break_lock: false,
        }
    }

    pub fn breaking_lock(mut self) -> Self {
        self.break_lock = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    name: String,
    revisions: Vec<Revision>,

    #[serde(default)]
    lock: Option<Lock>,

    #[serde(skip, default = "default_lock_timeout")]
    lock_timeout: Duration,

    /// Derived from the current revision
    #[serde(skip)]
    metadata: PageMetadata,
}

impl Page {
    /// Create a page with its first revision.
    pub fn create(name: impl Into<String>, edit: Edit, markup: &Markup) -> Self {
        let mut page = Self {
            name: name.into(),
            revisions: Vec::new(),
            lock: None,
            lock_timeout: default_lock_timeout(),
            metadata: PageMetadata::default(),
        };
        page.append(edit, markup);
        page
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a revision.
    ///
    /// Rejected with [`WikiError::LockConflict`] while another holder has an
    /// active lock, unless the edit breaks the lock. A successful write
    /// always releases the lock.
    pub fn write(&mut self, edit: Edit, markup: &Markup) -> Result<&Revision> {
        if let Some(holder) = self.lock_holder(edit.at) {
            if holder != edit.author.name && !edit.break_lock {
                return Err(WikiError::LockConflict {
                    page: self.name.clone(),
                    holder: holder.to_string(),
                });
            }
        }

        Ok(self.append(edit, markup))
    }

    fn append(&mut self, edit: Edit, markup: &Markup) -> &Revision {
        let number = self.revisions.len();
        self.revisions
            .push(Revision::new(number, edit.content, edit.author, edit.at));
        self.lock = None;
        self.refresh_metadata(markup);
        &self.revisions[number]
    }

    /// Re-derive categories and links from the current revision.
    pub fn refresh_metadata(&mut self, markup: &Markup) {
        self.metadata = markup.metadata(self.content());
    }

    pub fn lock(&mut self, at: DateTime<Utc>, holder: impl Into<String>) {
        self.lock = Some(Lock::new(holder, at));
    }

    pub fn unlock(&mut self) {
        self.lock = None;
    }

    pub fn locked(&self, at: DateTime<Utc>) -> bool {
        self.lock_holder(at).is_some()
    }

    /// Holder of the lock, if it is still active at `at`
    pub fn lock_holder(&self, at: DateTime<Utc>) -> Option<&str> {
        self.lock
            .as_ref()
            .filter(|lock| lock.is_active(at, self.lock_timeout))
            .map(|lock| lock.holder.as_str())
    }

    /// The stored lock, whether or not it has expired
    pub fn lock_info(&self) -> Option<&Lock> {
        self.lock.as_ref()
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub fn set_lock_timeout(&mut self, timeout: Duration) {
        self.lock_timeout = timeout;
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    pub fn revision(&self, index: usize) -> Result<&Revision> {
        self.revisions
            .get(index)
            .ok_or_else(|| WikiError::RevisionNotFound {
                page: self.name.clone(),
                index,
                count: self.revisions.len(),
            })
    }

    pub fn current_revision(&self) -> &Revision {
        // Pages are only built through `create`, so there is always one.
        &self.revisions[self.revisions.len() - 1]
    }

    pub fn content(&self) -> &str {
        self.current_revision().content()
    }

    pub fn author(&self) -> &Author {
        self.current_revision().author()
    }

    pub fn revised_at(&self) -> DateTime<Utc> {
        self.current_revision().timestamp()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.revisions[0].timestamp()
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.metadata.categories
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.metadata.categories.contains(category)
    }

    pub fn outgoing_links(&self) -> &[String] {
        &self.metadata.links
    }

    /// True if this page links to `name`; a page never references itself.
    pub fn references(&self, name: &str) -> bool {
        name != self.name && self.metadata.links.iter().any(|l| l == name)
    }

    pub(crate) fn has_revisions(&self) -> bool {
        !self.revisions.is_empty()
    }

    /// Make every revision number match its position; true if any changed.
    pub(crate) fn renumber_revisions(&mut self) -> bool {
        let mut changed = false;
        for (i, revision) in self.revisions.iter_mut().enumerate() {
            if revision.number() != i {
                revision.set_number(i);
                changed = true;
            }
        }
        changed
    }
}
