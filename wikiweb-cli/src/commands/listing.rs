//! Listings over a web: pages, categories, recent changes, authors and orphans.

use super::open_wiki;
use anyhow::{Context, Result};
use std::path::Path;
use wikiweb_core::Page;

pub fn list_pages(config_path: &Path, web: &str, category: Option<&str>) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    let names = wiki.with_web(web, |w| {
        let pages = match category {
            Some(category) => w.pages_in_category(category),
            None => w.select_all(),
        };
        page_names(pages)
    })?;

    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn list_categories(config_path: &Path, web: &str) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    for category in wiki.with_web(web, |w| w.categories())? {
        println!("{}", category);
    }
    Ok(())
}

/// Pages by last revision, most recent first
pub fn recent_pages(config_path: &Path, web: &str, limit: Option<usize>) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    let lines = wiki.with_web(web, |w| {
        w.pages_by_revision(limit)
            .into_iter()
            .map(|p| {
                format!(
                    "{}\t{}\t{}",
                    p.name(),
                    p.revised_at().format("%Y-%m-%d %H:%M:%S"),
                    p.author()
                )
            })
            .collect::<Vec<_>>()
    })?;

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub fn list_authors(config_path: &Path, web: &str) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    for author in wiki.with_web(web, |w| w.authors())? {
        println!("{}", author);
    }
    Ok(())
}

/// List orphaned pages; with `remove`, delete them (repeatedly with `all`).
pub fn orphans(
    config_path: &Path,
    web: &str,
    remove: bool,
    all: bool,
    system_password: Option<&str>,
) -> Result<()> {
    let wiki = open_wiki(config_path)?;

    if !remove {
        for name in wiki.with_web(web, |w| page_names(w.orphaned_pages()))? {
            println!("{}", name);
        }
        return Ok(());
    }

    let password = system_password.context("Removing pages requires --system-password")?;
    wiki.authenticate_system(password)?;

    loop {
        let removed = wiki.remove_orphaned_pages(web)?;
        if removed.is_empty() {
            break;
        }
        for page in &removed {
            println!("removed {}", page.name());
        }
        if !all {
            break;
        }
    }
    Ok(())
}

fn page_names(pages: Vec<&Page>) -> Vec<String> {
    pages.into_iter().map(|p| p.name().to_string()).collect()
}
