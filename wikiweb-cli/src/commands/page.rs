//! Page commands: write, show, lock and unlock.

use super::open_wiki;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use wikiweb_core::{Edit, Web};

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub content: Option<String>,
    pub author: Option<String>,
    pub origin: String,
    pub break_lock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    Raw,
    Html,
    Json,
}

#[derive(Serialize)]
struct PageView<'a> {
    name: &'a str,
    revision: usize,
    revisions: usize,
    author: &'a str,
    revised_at: DateTime<Utc>,
    categories: Vec<String>,
    links: Vec<String>,
    referenced_by: Vec<String>,
    locked_by: Option<&'a str>,
    content: &'a str,
}

pub fn write_page(config_path: &Path, web: &str, page: &str, opts: WriteOptions) -> Result<()> {
    let content = match opts.content {
        Some(content) => content,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read page content from stdin")?;
            buf
        }
    };

    let wiki = open_wiki(config_path)?;
    let author = wiki.author(opts.author.as_deref(), opts.origin);
    let mut edit = Edit::new(content, author, Utc::now());
    edit.break_lock = opts.break_lock;

    let revision = wiki
        .write_page_with(web, page, edit)
        .with_context(|| format!("Failed to write {}/{}", web, page))?;
    println!("✓ {} revision {} by {}", page, revision.number(), revision.author());
    Ok(())
}

pub fn show_page(
    config_path: &Path,
    web: &str,
    page: &str,
    rev: Option<usize>,
    format: ShowFormat,
    published: bool,
) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    let render = |w: &Web| -> Result<String> {
        let p = w.read_page(page)?;
        let revision = match rev {
            Some(i) => p.revision(i)?,
            None => p.current_revision(),
        };

        Ok(match format {
            ShowFormat::Raw => revision.content().to_string(),
            ShowFormat::Html => w.render_revision(page, revision.number())?,
            ShowFormat::Json => {
                let view = PageView {
                    name: p.name(),
                    revision: revision.number(),
                    revisions: p.revision_count(),
                    author: revision.author().name(),
                    revised_at: revision.timestamp(),
                    categories: revision.categories(w.markup()).into_iter().collect(),
                    links: revision.outgoing_links(w.markup()),
                    referenced_by: w.referenced_by(page),
                    locked_by: p.lock_holder(Utc::now()),
                    content: revision.content(),
                };
                serde_json::to_string_pretty(&view)?
            }
        })
    };
    let output = if published {
        wiki.with_published_web(web, render)??
    } else {
        wiki.with_web(web, render)??
    };

    println!("{}", output);
    Ok(())
}

pub fn lock_page(
    config_path: &Path,
    web: &str,
    page: &str,
    holder: &str,
    break_lock: bool,
) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    wiki.begin_edit(web, page, Utc::now(), holder, break_lock)?;
    println!("✓ {} locked by {}", page, holder);
    Ok(())
}

pub fn unlock_page(config_path: &Path, web: &str, page: &str) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    wiki.cancel_edit(web, page)?;
    println!("✓ {} unlocked", page);
    Ok(())
}
