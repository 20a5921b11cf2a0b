//! CLI for vidlink.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vidlink_core::config::DEFAULT_CONFIG_FILE;
use vidlink_core::{AppConfig, DispatchMode};

use crate::logging::{self, LogStream};
use commands::{run_collect, run_dispatch, run_init, run_list, run_show_config};

/// Top-level CLI for vidlink.
#[derive(Debug, Parser)]
#[command(name = "vidlink")]
#[command(about = "Collect media links from numbered video pages and hand them to a downloader", long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Write a default configuration file.
    Init,

    /// Resolve media links for a range of video IDs into the links file.
    Collect {
        /// First video ID (default: range.start from the config).
        #[arg(long)]
        start: Option<u32>,
        /// Last video ID, inclusive (default: range.end from the config).
        #[arg(long)]
        end: Option<u32>,
        /// Links file to write (default: output.links_file).
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Send the links of a links file to a download manager, the clipboard or the browser.
    Dispatch {
        /// One of: idm, aria2, wget, clipboard, browser.
        #[arg(long, short, value_parser = parse_mode)]
        mode: DispatchMode,
        /// Links file to read (default: output.links_file).
        #[arg(long, value_name = "FILE")]
        links: Option<PathBuf>,
        /// Write a JSON report of the run to this file.
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
        /// Directory download managers save into (default: dispatch.destination).
        #[arg(long, value_name = "DIR")]
        destination: Option<PathBuf>,
    },

    /// Show the entries of a links file.
    List {
        /// Links file to read (default: output.links_file).
        #[arg(long, value_name = "FILE")]
        links: Option<PathBuf>,
    },

    /// Print the effective configuration with cookie values shortened.
    ShowConfig,
}

fn parse_mode(value: &str) -> std::result::Result<DispatchMode, String> {
    value.parse().map_err(|e: vidlink_core::VidlinkError| e.to_string())
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        Cli::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            CliCommand::Init => {
                logging::init_logging_stderr();
                run_init(&self.config)?;
            }
            CliCommand::Collect { start, end, output } => {
                let cfg = load_config(&self.config, true)?;
                logging::init_for(&cfg.output.log_dir, LogStream::Collect);
                tracing::debug!("loaded config from {}", self.config.display());
                run_collect(&cfg, start, end, output).await?;
            }
            CliCommand::Dispatch {
                mode,
                links,
                report,
                destination,
            } => {
                let cfg = load_config(&self.config, false)?;
                logging::init_for(&cfg.output.log_dir, LogStream::Dispatch);
                run_dispatch(&cfg, mode, links, report, destination)?;
            }
            CliCommand::List { links } => {
                logging::init_logging_stderr();
                let cfg = load_config(&self.config, false)?;
                run_list(&cfg, links)?;
            }
            CliCommand::ShowConfig => {
                logging::init_logging_stderr();
                let cfg = load_config(&self.config, false)?;
                run_show_config(&cfg, &self.config)?;
            }
        }

        Ok(())
    }
}

/// Load the configuration file. When it does not exist and `required` is
/// false, the built-in defaults are used.
fn load_config(path: &Path, required: bool) -> Result<AppConfig> {
    if !path.exists() && !required {
        return Ok(AppConfig::default());
    }
    AppConfig::load(path).with_context(|| {
        format!(
            "loading {} (run `vidlink init` to create one)",
            path.display()
        )
    })
}

#[cfg(test)]
mod tests;
