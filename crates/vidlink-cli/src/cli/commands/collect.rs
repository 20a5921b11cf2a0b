//! `vidlink collect` – resolve media links for a range of video IDs.

use anyhow::Result;
use std::path::PathBuf;
use vidlink_core::{AppConfig, LinkCollector};

pub async fn run_collect(
    cfg: &AppConfig,
    start: Option<u32>,
    end: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let start = start.unwrap_or(cfg.range.start);
    let end = end.unwrap_or(cfg.range.end);
    let links_file = output.unwrap_or_else(|| cfg.output.links_file.clone());

    let collector = LinkCollector::from_config(cfg)?;
    println!(
        "Collecting video IDs {}..={} into {}",
        start,
        end,
        links_file.display()
    );

    let result = collector.collect(start, end, &links_file).await?;

    let failures: Vec<_> = result.failures().collect();
    println!(
        "Processed {} ID(s): {} resolved, {} failed ({} requests)",
        result.len(),
        result.len() - failures.len(),
        failures.len(),
        collector.client().requests_sent()
    );
    for record in failures {
        let reason = record
            .failure
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("  {} {}: {}", record.video_id, record.file_name, reason);
    }
    println!("Links written to {}", links_file.display());

    Ok(())
}
