//! Homogeneous app registry
//!
//! Instead of per-app generated symbols, every app is one uniform entry:
//! its private state, its lifecycle status and its process id. The runtime
//! iterates this collection for the merged invariant check and looks
//! entries up by the app name carried in each bus message.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::model::VerificationModel;
use crate::state::AppState;
use crate::types::{AppName, AppStatus, ProcessId};

/// One registered app
#[derive(Clone, Debug, PartialEq)]
pub struct AppEntry {
    /// App name
    pub name: AppName,
    /// Private state; released (emptied) once the app is killed
    pub state: AppState,
    /// Lifecycle status
    pub status: AppStatus,
    /// OS process id, if the supervisor reported one
    pub pid: Option<ProcessId>,
}

impl AppEntry {
    /// Whether the app's invariant takes part in the merged check
    pub fn is_live(&self) -> bool {
        self.status == AppStatus::Running
    }
}

/// All registered apps, keyed by name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppRegistry {
    apps: BTreeMap<AppName, AppEntry>,
}

impl AppRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the model: one Running entry per app, its
    /// state at the declared defaults, pids taken from the supervisor's
    /// report where present.
    pub fn from_model(model: &VerificationModel, pids: &BTreeMap<AppName, ProcessId>) -> Self {
        let apps = model
            .apps
            .iter()
            .map(|(name, app)| {
                (
                    name.clone(),
                    AppEntry {
                        name: name.clone(),
                        state: AppState::from_shape(&app.state_shape),
                        status: AppStatus::Running,
                        pid: pids.get(name).copied(),
                    },
                )
            })
            .collect();
        Self { apps }
    }

    /// Register a single app
    pub fn register(&mut self, name: &str, state: AppState, pid: Option<ProcessId>) {
        self.apps.insert(
            name.into(),
            AppEntry {
                name: name.into(),
                state,
                status: AppStatus::Running,
                pid,
            },
        );
    }

    /// Entry by name
    pub fn get(&self, name: &str) -> Option<&AppEntry> {
        self.apps.get(name)
    }

    /// Mutable entry by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut AppEntry> {
        self.apps.get_mut(name)
    }

    /// Whether the app is registered and Running
    pub fn is_live(&self, name: &str) -> bool {
        self.apps.get(name).is_some_and(AppEntry::is_live)
    }

    /// Live entries in name order
    pub fn live(&self) -> impl Iterator<Item = &AppEntry> {
        self.apps.values().filter(|entry| entry.is_live())
    }

    /// All entries in name order
    pub fn iter(&self) -> impl Iterator<Item = &AppEntry> {
        self.apps.values()
    }

    /// Mark an app Killed and release its private state. Returns false if
    /// the app is unknown; killing a killed app is a no-op.
    pub fn kill(&mut self, name: &str) -> bool {
        match self.apps.get_mut(name) {
            Some(entry) => {
                entry.status = AppStatus::Killed;
                entry.state = AppState::released();
                true
            }
            None => false,
        }
    }

    /// Number of registered apps
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Whether no app is registered
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Number of live apps
    pub fn live_count(&self) -> usize {
        self.live().count()
    }
}
