//! Browser handler

use std::time::Duration;

use tracing::debug;

use super::{run_program, split_command, DispatchSettings, Link, LinkHandler, Stderr};
use crate::error::DispatchError;

/// Opens each URL with the platform opener
#[derive(Debug, Clone)]
pub struct BrowserOpener {
    command: Vec<String>,
    delay: Duration,
}

impl BrowserOpener {
    /// Create an opener, using the configured command or the platform default.
    pub fn new(settings: &DispatchSettings) -> Self {
        let command = settings
            .opener_command
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_command);
        Self {
            command,
            delay: settings.browser_delay,
        }
    }

    /// Command the URL is appended to
    pub fn command(&self) -> &[String] {
        &self.command
    }
}

impl LinkHandler for BrowserOpener {
    fn name(&self) -> &str {
        "browser"
    }

    fn send_link(&mut self, link: &Link<'_>) -> Result<(), DispatchError> {
        let Some((program, base_args)) = split_command(&self.command) else {
            return Err(DispatchError::NotFound {
                program: "browser".to_string(),
            });
        };
        let mut args = base_args.to_vec();
        args.push(link.url.to_string());
        debug!(program, url = link.url, "Opening in browser");
        run_program(program, &args, None, Stderr::Discard)
    }

    fn pause(&self) -> Duration {
        self.delay
    }
}

fn default_command() -> Vec<String> {
    let parts: &[&str] = if cfg!(target_os = "macos") {
        &["open"]
    } else if cfg!(windows) {
        // empty title argument so `start` does not treat the URL as one
        &["cmd", "/C", "start", ""]
    } else {
        &["xdg-open"]
    };
    parts.iter().map(|s| s.to_string()).collect()
}
