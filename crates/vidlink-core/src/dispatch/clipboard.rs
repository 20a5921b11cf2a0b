//! Clipboard handler
//!
//! Writes every URL, one per line, to the platform clipboard program in a
//! single call. The outcome of that call applies to all links.

use tracing::debug;

use super::{run_program, split_command, DispatchSettings, Link, LinkHandler, Stderr};
use crate::error::DispatchError;

/// Copies URLs to the system clipboard
#[derive(Debug, Clone)]
pub struct ClipboardWriter {
    command: Vec<String>,
}

impl ClipboardWriter {
    /// Create a writer, using the configured command or the platform default.
    pub fn new(settings: &DispatchSettings) -> Self {
        let command = settings
            .clipboard_command
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_command);
        Self { command }
    }

    /// Command the URLs are piped into
    pub fn command(&self) -> &[String] {
        &self.command
    }

    fn write(&self, text: &str) -> Result<(), DispatchError> {
        let Some((program, args)) = split_command(&self.command) else {
            return Err(DispatchError::NotFound {
                program: "clipboard".to_string(),
            });
        };
        debug!(program, bytes = text.len(), "Writing to clipboard");
        run_program(program, args, Some(text), Stderr::Discard)
    }
}

impl LinkHandler for ClipboardWriter {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn send_link(&mut self, link: &Link<'_>) -> Result<(), DispatchError> {
        self.write(&format!("{}\n", link.url))
    }

    fn send_all(&mut self, links: &[Link<'_>]) -> Vec<Result<(), DispatchError>> {
        let text: String = links.iter().map(|link| format!("{}\n", link.url)).collect();
        match self.write(&text) {
            Ok(()) => links.iter().map(|_| Ok(())).collect(),
            Err(e) => links.iter().map(|_| Err(e.replicate())).collect(),
        }
    }
}

fn default_command() -> Vec<String> {
    let parts: &[&str] = if cfg!(target_os = "macos") {
        &["pbcopy"]
    } else if cfg!(windows) {
        &["clip"]
    } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        &["wl-copy"]
    } else {
        &["xclip", "-selection", "clipboard"]
    };
    parts.iter().map(|s| s.to_string()).collect()
}
