//! Value types for authors, revisions and advisory locks.

use crate::markup::Markup;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How long a lock stays active when nothing else is configured.
pub const DEFAULT_LOCK_TIMEOUT_MINUTES: i64 = 30;

pub fn default_lock_timeout() -> Duration {
    Duration::minutes(DEFAULT_LOCK_TIMEOUT_MINUTES)
}

/// Who made a change
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,

    /// Where the change came from (usually the client address)
    pub origin: String,
}

impl Author {
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One immutable snapshot of a page's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    number: usize,
    content: String,
    author: Author,
    timestamp: DateTime<Utc>,
}

impl Revision {
    pub(crate) fn new(
        number: usize,
        content: String,
        author: Author,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            content,
            author,
            timestamp,
        }
    }

    /// 0-based position within the page's history
    pub fn number(&self) -> usize {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: usize) {
        self.number = number;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Categories derived from this revision's own content.
    pub fn categories(&self, markup: &Markup) -> BTreeSet<String> {
        markup.metadata(&self.content).categories
    }

    /// Link targets derived from this revision's own content.
    pub fn outgoing_links(&self, markup: &Markup) -> Vec<String> {
        markup.metadata(&self.content).links
    }
}

/// Advisory claim on a page while someone edits it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
}

impl Lock {
    pub fn new(holder: impl Into<String>, acquired_at: DateTime<Utc>) -> Self {
        Self {
            holder: holder.into(),
            acquired_at,
        }
    }

    /// A lock older than `timeout` at `at` counts as released.
    pub fn is_active(&self, at: DateTime<Utc>, timeout: Duration) -> bool {
        at - self.acquired_at < timeout
    }
}
