//! CLI command implementations.

pub mod init;
pub mod listing;
pub mod page;
pub mod search;
pub mod web;

use anyhow::{Context, Result};
use std::path::Path;
use wikiweb_core::{Config, WikiService};

pub use init::init_wiki;
pub use listing::{list_authors, list_categories, list_pages, orphans, recent_pages};
pub use page::{lock_page, show_page, unlock_page, write_page, ShowFormat, WriteOptions};
pub use search::search_web;
pub use web::{create_web, list_webs};

/// Load the configuration and open the wiki it describes
pub(crate) fn open_wiki(config_path: &Path) -> Result<WikiService> {
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    WikiService::from_config(config).context("Failed to open wiki storage")
}
