//! Type extraction from a running game process.
//!
//! Reading process memory is left to a [`ProcessInspector`]. This module owns
//! the launch-and-wait policy around it.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use sysinfo::System;
use tracing::{debug, info, warn};

use gridiron_ebx::TypeDescriptorRecord;

use crate::{Error, Result};

/// Process name of the unpacked game executable.
pub const DEFAULT_PROCESS_NAME: &str = "Madden22_orig.exe";
/// Delay between running-state checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(750);
/// Checks before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Reads type metadata out of a live process.
pub trait ProcessInspector: Send + Sync {
    /// Whether a process with this name is running.
    ///
    /// Defaults to a lookup in the system process list.
    fn is_running(&self, process_name: &str) -> anyhow::Result<bool> {
        Ok(process_is_running(process_name))
    }

    /// Read every type descriptor from the process.
    fn read_types(&self, process_name: &str) -> anyhow::Result<Vec<TypeDescriptorRecord>>;
}

/// Starts the game.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, exe_path: &Path) -> anyhow::Result<()>;
}

/// Spawns the executable and detaches from it.
///
/// The child handle is dropped without a wait; the game keeps running after
/// extraction finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandLauncher;

impl ProcessLauncher for CommandLauncher {
    fn launch(&self, exe_path: &Path) -> anyhow::Result<()> {
        let child = std::process::Command::new(exe_path)
            .spawn()
            .with_context(|| format!("failed to launch {}", exe_path.display()))?;
        debug!(pid = child.id(), exe = %exe_path.display(), "launched game");
        Ok(())
    }
}

/// Whether a process named `process_name` (ASCII case-insensitive) is running.
pub(crate) fn process_is_running(process_name: &str) -> bool {
    let mut system = System::new_all();
    system.refresh_all();
    system
        .processes()
        .values()
        .any(|process| process.name().to_string_lossy().eq_ignore_ascii_case(process_name))
}

/// How long to wait for the game to come up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPolicy {
    pub process_name: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self {
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Launches the game if needed, waits for it, then reads its types.
pub struct LiveTypeExtractor {
    inspector: Box<dyn ProcessInspector>,
    launcher: Box<dyn ProcessLauncher>,
    policy: LaunchPolicy,
}

impl LiveTypeExtractor {
    /// Extractor with the default launcher and policy.
    pub fn new<I: ProcessInspector + 'static>(inspector: I) -> Self {
        Self {
            inspector: Box::new(inspector),
            launcher: Box::new(CommandLauncher),
            policy: LaunchPolicy::default(),
        }
    }

    pub fn with_launcher<L: ProcessLauncher + 'static>(mut self, launcher: L) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    pub fn with_policy(mut self, policy: LaunchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &LaunchPolicy {
        &self.policy
    }

    /// Read type descriptors from the running game, launching `exe_path` first
    /// when it is not running.
    ///
    /// Timeouts and inspector failures are returned as is; nothing is retried.
    pub fn extract(&self, exe_path: &Path) -> Result<Vec<TypeDescriptorRecord>> {
        let name = self.policy.process_name.as_str();

        if !self.inspector.is_running(name).map_err(Error::Inspection)? {
            info!(exe = %exe_path.display(), process = name, "game not running, launching");
            self.launcher.launch(exe_path).map_err(Error::Inspection)?;
            self.wait_for(name)?;
        }

        let records = self.inspector.read_types(name).map_err(Error::Inspection)?;
        info!(process = name, types = records.len(), "read types from live process");
        Ok(records)
    }

    fn wait_for(&self, name: &str) -> Result<()> {
        let mut attempts = 0;
        loop {
            thread::sleep(self.policy.poll_interval);
            if self.inspector.is_running(name).map_err(Error::Inspection)? {
                debug!(process = name, attempts = attempts + 1, "process is up");
                return Ok(());
            }

            attempts += 1;
            if attempts >= self.policy.max_attempts {
                warn!(process = name, attempts, "gave up waiting for process");
                return Err(Error::ProcessTimeout {
                    process: name.to_string(),
                    attempts,
                });
            }
        }
    }
}

impl std::fmt::Debug for LiveTypeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTypeExtractor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
