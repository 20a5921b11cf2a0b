//! `vidlink init` – write a default configuration file.

use anyhow::Result;
use std::path::Path;
use vidlink_core::AppConfig;

pub fn run_init(path: &Path) -> Result<()> {
    AppConfig::init(path)?;
    println!("Created {}", path.display());
    println!("Set site.base_url, [site.cookies] and [layout] before running `vidlink collect`.");
    Ok(())
}
