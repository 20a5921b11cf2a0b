//! `vidlink list` – show the entries of a links file.

use anyhow::{Context, Result};
use std::path::PathBuf;
use vidlink_core::{artifact, AppConfig, LinkEntry};

pub fn run_list(cfg: &AppConfig, links: Option<PathBuf>) -> Result<()> {
    let links_file = links.unwrap_or_else(|| cfg.output.links_file.clone());
    let entries = artifact::load(&links_file)
        .with_context(|| format!("reading links from {}", links_file.display()))?;

    if entries.is_empty() {
        println!("No links in {}.", links_file.display());
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        println!("{}", format_entry(i + 1, entry));
    }
    let unresolved = entries.iter().filter(|e| e.media_url.is_none()).count();
    println!(
        "\n{} link(s), {} unresolved",
        entries.len() - unresolved,
        unresolved
    );
    Ok(())
}

pub(crate) fn format_entry(number: usize, entry: &LinkEntry) -> String {
    match &entry.media_url {
        Some(url) => format!("{:>3}. {}\n     {}", number, entry.file_name, url),
        None => {
            let id = entry
                .video_id
                .map(|id| format!(" video {}", id))
                .unwrap_or_default();
            let note = entry
                .note
                .as_deref()
                .map(|n| format!(": {}", n))
                .unwrap_or_default();
            format!(
                "{:>3}. {} [UNRESOLVED{}{}]",
                number, entry.file_name, id, note
            )
        }
    }
}
