//! `vidlink show-config` – print the effective configuration.

use anyhow::Result;
use std::path::Path;
use vidlink_core::AppConfig;

pub fn run_show_config(cfg: &AppConfig, path: &Path) -> Result<()> {
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, built-in defaults)", path.display())
    };
    println!("# {}", source);
    print!("{}", cfg.redacted().to_toml()?);
    Ok(())
}
