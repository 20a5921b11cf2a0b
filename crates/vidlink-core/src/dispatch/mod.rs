//! Download dispatch
//!
//! Routes the resolved entries of a link list to one external handler:
//! a download manager, the system clipboard, or the web browser.
//! Every handler implements [`LinkHandler`]; [`dispatch`] skips entries
//! without a URL, collects per-link outcomes and never aborts midway.
//!
//! Dispatch is plain blocking code.

mod browser;
mod clipboard;
mod manager;

pub use browser::BrowserOpener;
pub use clipboard::ClipboardWriter;
pub use manager::ManagerLauncher;

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DispatchError, Result, VidlinkError};
use crate::types::LinkEntry;

/// Supported download managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    /// Internet Download Manager: `idman /d <url> /f <name> /p <dest> /a`
    /// per link, then `idman /s` to start the queue
    Idm,
    /// aria2: `aria2c --dir <dest> --out <name> --continue=true <url>`
    Aria2,
    /// GNU Wget: `wget --continue -O <dest>/<name> <url>`
    Wget,
}

impl ManagerKind {
    /// Executable name looked up on PATH
    pub fn program(&self) -> &'static str {
        match self {
            ManagerKind::Idm => "idman",
            ManagerKind::Aria2 => "aria2c",
            ManagerKind::Wget => "wget",
        }
    }

    /// Arguments that hand one link to the manager
    pub fn link_args(&self, link: &Link<'_>, destination: &Path) -> Vec<String> {
        let dest = destination.display().to_string();
        match self {
            ManagerKind::Idm => vec![
                "/d".to_string(),
                link.url.to_string(),
                "/f".to_string(),
                link.file_name.to_string(),
                "/p".to_string(),
                dest,
                "/a".to_string(),
            ],
            ManagerKind::Aria2 => vec![
                "--dir".to_string(),
                dest,
                "--out".to_string(),
                link.file_name.to_string(),
                "--continue=true".to_string(),
                link.url.to_string(),
            ],
            ManagerKind::Wget => vec![
                "--continue".to_string(),
                "-O".to_string(),
                destination.join(link.file_name).display().to_string(),
                link.url.to_string(),
            ],
        }
    }

    /// Arguments of the call made once all links are queued, if any
    pub fn finish_args(&self) -> Option<Vec<String>> {
        match self {
            ManagerKind::Idm => Some(vec!["/s".to_string()]),
            ManagerKind::Aria2 | ManagerKind::Wget => None,
        }
    }
}

/// How links leave the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Spawn a download manager per link
    Manager(ManagerKind),
    /// Copy all URLs to the clipboard at once
    Clipboard,
    /// Open each URL in the default browser
    Browser,
}

impl DispatchMode {
    /// All accepted mode names
    pub const NAMES: [&'static str; 5] = ["idm", "aria2", "wget", "clipboard", "browser"];

    /// Build the handler for this mode.
    pub fn handler(&self, settings: &DispatchSettings) -> Box<dyn LinkHandler> {
        match self {
            DispatchMode::Manager(kind) => Box::new(ManagerLauncher::new(*kind, settings)),
            DispatchMode::Clipboard => Box::new(ClipboardWriter::new(settings)),
            DispatchMode::Browser => Box::new(BrowserOpener::new(settings)),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchMode::Manager(ManagerKind::Idm) => "idm",
            DispatchMode::Manager(ManagerKind::Aria2) => "aria2",
            DispatchMode::Manager(ManagerKind::Wget) => "wget",
            DispatchMode::Clipboard => "clipboard",
            DispatchMode::Browser => "browser",
        };
        f.write_str(name)
    }
}

impl FromStr for DispatchMode {
    type Err = VidlinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idm" => Ok(DispatchMode::Manager(ManagerKind::Idm)),
            "aria2" | "aria2c" => Ok(DispatchMode::Manager(ManagerKind::Aria2)),
            "wget" => Ok(DispatchMode::Manager(ManagerKind::Wget)),
            "clipboard" => Ok(DispatchMode::Clipboard),
            "browser" => Ok(DispatchMode::Browser),
            other => Err(VidlinkError::Config(format!(
                "unknown dispatch mode {:?} (expected one of {})",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Settings shared by all handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Directory download managers save into
    pub destination: PathBuf,
    /// Pause between download-manager invocations
    pub manager_delay: Duration,
    /// Pause between browser opens
    pub browser_delay: Duration,
    /// Executable used instead of the manager's default name
    pub manager_program: Option<String>,
    /// Command receiving the URL list on stdin instead of the platform default
    pub clipboard_command: Option<Vec<String>>,
    /// Command that opens a URL instead of the platform default
    pub opener_command: Option<Vec<String>>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("downloads"),
            manager_delay: Duration::from_millis(500),
            browser_delay: Duration::from_millis(1000),
            manager_program: None,
            clipboard_command: None,
            opener_command: None,
        }
    }
}

/// A resolved link as seen by a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<'a> {
    /// Media URL
    pub url: &'a str,
    /// Suggested filename
    pub file_name: &'a str,
}

/// A link that could not be handed over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedLink {
    pub file_name: String,
    pub url: String,
    pub reason: String,
}

/// Outcome of a dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Handler name
    pub handler: String,
    /// Links handed over successfully
    pub succeeded: usize,
    /// Links the handler failed on
    pub failed: usize,
    /// Entries without a URL
    pub skipped: usize,
    /// Failure details, in link order
    pub failures: Vec<FailedLink>,
}

impl DispatchReport {
    /// Number of entries this report accounts for
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `VidlinkError::Io` if the file cannot be written.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VidlinkError::Config(format!("report serialization: {}", e)))?;
        fs::write(path, json).map_err(|e| VidlinkError::io(path, e))
    }
}

/// A sink for resolved links.
pub trait LinkHandler {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Hand over one link.
    fn send_link(&mut self, link: &Link<'_>) -> std::result::Result<(), DispatchError>;

    /// Pause between two consecutive links
    fn pause(&self) -> Duration {
        Duration::ZERO
    }

    /// Hand over all links, returning one outcome per link in order.
    ///
    /// The default sends links one at a time with [`pause`](Self::pause)
    /// between them.
    fn send_all(&mut self, links: &[Link<'_>]) -> Vec<std::result::Result<(), DispatchError>> {
        let pause = self.pause();
        let mut outcomes = Vec::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                thread::sleep(pause);
            }
            outcomes.push(self.send_link(link));
        }
        outcomes
    }

    /// Called once after all links were sent.
    fn finish(&mut self) -> std::result::Result<(), DispatchError> {
        Ok(())
    }
}

/// Send every resolved entry through `handler`.
///
/// Entries without a URL are counted as skipped. A failing link is
/// recorded and the remaining links are still sent. A failing
/// [`finish`](LinkHandler::finish) is logged and does not change the counts.
pub fn dispatch_with(links: &[LinkEntry], handler: &mut dyn LinkHandler) -> DispatchReport {
    let mut report = DispatchReport {
        handler: handler.name().to_string(),
        ..Default::default()
    };

    let resolved: Vec<Link<'_>> = links
        .iter()
        .filter_map(|entry| {
            entry.media_url.as_deref().map(|url| Link {
                url,
                file_name: &entry.file_name,
            })
        })
        .collect();
    report.skipped = links.len() - resolved.len();
    if report.skipped > 0 {
        info!(skipped = report.skipped, "Skipping unresolved entries");
    }

    if resolved.is_empty() {
        return report;
    }

    let mut outcomes = handler.send_all(&resolved).into_iter();
    for link in &resolved {
        let outcome = outcomes.next().unwrap_or_else(|| {
            Err(DispatchError::Io {
                program: report.handler.clone(),
                source: io::Error::new(io::ErrorKind::Other, "handler reported no outcome"),
            })
        });
        match outcome {
            Ok(()) => {
                report.succeeded += 1;
                info!(handler = %report.handler, file = link.file_name, "Link sent");
            }
            Err(e) => {
                report.failed += 1;
                warn!(handler = %report.handler, file = link.file_name, error = %e, "Link failed");
                report.failures.push(FailedLink {
                    file_name: link.file_name.to_string(),
                    url: link.url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Err(e) = handler.finish() {
        warn!(handler = %report.handler, error = %e, "Finishing dispatch failed");
    }

    info!(
        handler = %report.handler,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Dispatch finished"
    );
    report
}

/// Send a link list with the handler of `mode`.
///
/// # Example
/// ```no_run
/// use vidlink_core::artifact;
/// use vidlink_core::dispatch::{dispatch, DispatchMode, DispatchSettings};
///
/// let links = artifact::load("download_links.txt".as_ref()).unwrap();
/// let mode: DispatchMode = "aria2".parse().unwrap();
/// let report = dispatch(&links, mode, &DispatchSettings::default());
/// assert_eq!(report.total(), links.len());
/// ```
pub fn dispatch(links: &[LinkEntry], mode: DispatchMode, settings: &DispatchSettings) -> DispatchReport {
    let mut handler = mode.handler(settings);
    dispatch_with(links, handler.as_mut())
}

/// How `run_program` treats the program's stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stderr {
    /// Collect it for the error report
    Capture,
    /// Discard it. Programs that leave a background process behind
    /// (clipboard owners, browsers) would otherwise hold the pipe open.
    Discard,
}

/// Run an external program to completion, optionally feeding `input` on stdin.
pub(crate) fn run_program(
    program: &str,
    args: &[String],
    input: Option<&str>,
    stderr: Stderr,
) -> std::result::Result<(), DispatchError> {
    let io_error = |source| DispatchError::Io {
        program: program.to_string(),
        source,
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(match stderr {
            Stderr::Capture => Stdio::piped(),
            Stderr::Discard => Stdio::null(),
        });

    let mut child = command.spawn().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DispatchError::NotFound {
            program: program.to_string(),
        },
        _ => DispatchError::Spawn {
            program: program.to_string(),
            source: e,
        },
    })?;

    if let (Some(text), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin.write_all(text.as_bytes()).map_err(io_error)?;
    }

    let (status, stderr_text) = match stderr {
        Stderr::Capture => {
            let output = child.wait_with_output().map_err(io_error)?;
            let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
            (output.status, text)
        }
        Stderr::Discard => (child.wait().map_err(io_error)?, String::new()),
    };

    if !status.success() {
        return Err(DispatchError::ExitStatus {
            program: program.to_string(),
            status: status.to_string(),
            stderr: stderr_text,
        });
    }
    Ok(())
}

/// Split a configured command into program and leading arguments.
pub(crate) fn split_command(command: &[String]) -> Option<(&str, &[String])> {
    command
        .split_first()
        .map(|(program, args)| (program.as_str(), args))
}
