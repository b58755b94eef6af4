//! Init command implementation.

use super::open_wiki;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../../../wikiweb.yml.example");

/// Write a default config if none exists, then set up the system and the first web
pub fn init_wiki(config_path: &Path, password: &str, web_name: &str, address: &str) -> Result<()> {
    write_config(config_path)?;

    let wiki = open_wiki(config_path)?;
    if wiki.initialize_system(password, web_name, address)? {
        println!("✓ wikiweb initialized with web '{}' at /{}", web_name, address);
    } else {
        println!("wikiweb is already set up; nothing changed");
    }
    Ok(())
}

fn write_config(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        return Ok(());
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}
