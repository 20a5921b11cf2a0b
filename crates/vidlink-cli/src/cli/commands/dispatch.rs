//! `vidlink dispatch` – send collected links to an external handler.

use anyhow::{Context, Result};
use std::path::PathBuf;
use vidlink_core::{artifact, dispatch, AppConfig, DispatchMode, DispatchReport};

pub fn run_dispatch(
    cfg: &AppConfig,
    mode: DispatchMode,
    links: Option<PathBuf>,
    report_path: Option<PathBuf>,
    destination: Option<PathBuf>,
) -> Result<()> {
    let links_file = links.unwrap_or_else(|| cfg.output.links_file.clone());
    let entries = artifact::load(&links_file)
        .with_context(|| format!("reading links from {}", links_file.display()))?;

    let mut settings = cfg.dispatch_settings();
    if let Some(dir) = destination {
        settings.destination = dir;
    }

    println!(
        "Dispatching {} entr{} from {} via {}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        links_file.display(),
        mode
    );
    let report = dispatch(&entries, mode, &settings);
    print_report(&report);

    if let Some(path) = report_path {
        report.write_json(&path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &DispatchReport) {
    println!(
        "{}: {} sent, {} failed, {} skipped",
        report.handler, report.succeeded, report.failed, report.skipped
    );
    for failure in &report.failures {
        println!("  FAILED {} ({}): {}", failure.file_name, failure.url, failure.reason);
    }
}
