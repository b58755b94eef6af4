//! Web registry commands.

use super::open_wiki;
use anyhow::Result;
use std::path::Path;

pub fn create_web(config_path: &Path, name: &str, address: &str, system_password: &str) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    wiki.authenticate_system(system_password)?;
    wiki.create_web(name, address)?;
    println!("✓ Created web '{}' at /{}", name, address);
    Ok(())
}

/// One line per web: address, name and page count
pub fn list_webs(config_path: &Path) -> Result<()> {
    let wiki = open_wiki(config_path)?;
    for web in wiki.webs() {
        let web = web.read();
        if web.settings().count_pages {
            println!("{}\t{}\t{} pages", web.address(), web.name(), web.len());
        } else {
            println!("{}\t{}", web.address(), web.name());
        }
    }
    Ok(())
}
