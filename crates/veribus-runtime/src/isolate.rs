//! App isolation
//!
//! Terminating an offending app's process is the one irreversible action
//! the runtime takes, so it sits behind the `ProcessControl` capability
//! trait: production uses real process termination, tests substitute a
//! recording fake. The `Isolator` adds the policy on top - a process-id
//! registry, idempotence, and the guarantee that a failed termination
//! never takes the verifier down with it.

use std::collections::{BTreeMap, BTreeSet};
use std::process::Command;

use thiserror::Error;
use tracing::{error, info};

use veribus_core::{AppName, ProcessId};

/// Isolation failure; logged by the caller, never retried
#[derive(Debug, Error)]
pub enum IsolateError {
    /// The registry has no process id for the app
    #[error("no process id registered for app {app}")]
    UnknownApp {
        /// App name
        app: AppName,
    },
    /// Spawning the termination command failed
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        /// Target process
        pid: u32,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The termination command reported failure (process already gone,
    /// permission denied)
    #[error("termination of process {pid} exited with status {status}")]
    Terminate {
        /// Target process
        pid: u32,
        /// Exit status of the kill command
        status: i32,
    },
}

/// Capability to terminate an app's process
pub trait ProcessControl {
    /// Request termination of the process. Fire-and-forget: the caller
    /// does not wait for the target to exit.
    fn kill(&self, pid: ProcessId) -> Result<(), IsolateError>;
}

/// Terminates real OS processes via `kill -9`
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProcessControl;

impl ProcessControl for SystemProcessControl {
    fn kill(&self, pid: ProcessId) -> Result<(), IsolateError> {
        let status = Command::new("kill")
            .arg("-9")
            .arg(pid.0.to_string())
            .status()
            .map_err(|source| IsolateError::Signal {
                pid: pid.0,
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(IsolateError::Terminate {
                pid: pid.0,
                status: status.code().unwrap_or(-1),
            })
        }
    }
}

/// Recording fake for tests: kills nothing, remembers everything.
///
/// Clones share one record list, so a handle kept outside the verifier
/// observes the kills requested inside it.
#[derive(Clone, Debug, Default)]
pub struct RecordingProcessControl {
    killed: std::rc::Rc<std::cell::RefCell<Vec<ProcessId>>>,
    /// When true, every kill reports failure
    pub fail: bool,
}

impl RecordingProcessControl {
    /// A fake that accepts every kill
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake whose kills always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Pids killed so far, in order
    pub fn killed(&self) -> Vec<ProcessId> {
        self.killed.borrow().clone()
    }
}

impl ProcessControl for RecordingProcessControl {
    fn kill(&self, pid: ProcessId) -> Result<(), IsolateError> {
        self.killed.borrow_mut().push(pid);
        if self.fail {
            Err(IsolateError::Terminate {
                pid: pid.0,
                status: 1,
            })
        } else {
            Ok(())
        }
    }
}

/// Terminates named apps given a process-id registry.
///
/// Idempotent: isolating an already-isolated app is a no-op. Failures are
/// reported to the caller for logging but are never retried and never
/// panic.
pub struct Isolator<P: ProcessControl> {
    control: P,
    pids: BTreeMap<AppName, ProcessId>,
    isolated: BTreeSet<AppName>,
}

impl<P: ProcessControl> Isolator<P> {
    /// Isolator over the given pid registry
    pub fn new(control: P, pids: BTreeMap<AppName, ProcessId>) -> Self {
        Self {
            control,
            pids,
            isolated: BTreeSet::new(),
        }
    }

    /// Whether the app has already been isolated
    pub fn is_isolated(&self, app: &str) -> bool {
        self.isolated.contains(app)
    }

    /// Request termination of the named app's process.
    pub fn isolate(&mut self, app: &str) -> Result<(), IsolateError> {
        if self.isolated.contains(app) {
            info!(app, "app already isolated, nothing to do");
            return Ok(());
        }
        let pid = *self
            .pids
            .get(app)
            .ok_or_else(|| IsolateError::UnknownApp { app: app.into() })?;

        match self.control.kill(pid) {
            Ok(()) => {
                info!(app, pid = pid.0, "app isolated");
                self.isolated.insert(app.into());
                Ok(())
            }
            Err(e) => {
                // The app still counts as isolated: the verdict stands and
                // a dead-on-arrival process must not be signalled again.
                error!(app, pid = pid.0, "failed to terminate app: {e}");
                self.isolated.insert(app.into());
                Err(e)
            }
        }
    }
}
