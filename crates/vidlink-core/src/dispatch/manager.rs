//! Download-manager handler

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use super::{run_program, DispatchSettings, Link, LinkHandler, ManagerKind, Stderr};
use crate::error::DispatchError;

/// Spawns a download manager once per link
#[derive(Debug, Clone)]
pub struct ManagerLauncher {
    kind: ManagerKind,
    program: String,
    destination: PathBuf,
    delay: Duration,
}

impl ManagerLauncher {
    /// Create a launcher for `kind` using the shared settings.
    pub fn new(kind: ManagerKind, settings: &DispatchSettings) -> Self {
        Self {
            kind,
            program: settings
                .manager_program
                .clone()
                .unwrap_or_else(|| kind.program().to_string()),
            destination: settings.destination.clone(),
            delay: settings.manager_delay,
        }
    }

    /// Executable that will be spawned
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl LinkHandler for ManagerLauncher {
    fn name(&self) -> &str {
        self.kind.program()
    }

    fn send_link(&mut self, link: &Link<'_>) -> Result<(), DispatchError> {
        let args = self.kind.link_args(link, &self.destination);
        debug!(program = %self.program, ?args, "Spawning download manager");
        run_program(&self.program, &args, None, Stderr::Capture)
    }

    fn pause(&self) -> Duration {
        self.delay
    }

    fn finish(&mut self) -> Result<(), DispatchError> {
        match self.kind.finish_args() {
            Some(args) => {
                info!(program = %self.program, ?args, "Starting download queue");
                run_program(&self.program, &args, None, Stderr::Capture)
            }
            None => Ok(()),
        }
    }
}
