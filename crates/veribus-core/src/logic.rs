//! App iteration execution
//!
//! Runs one app's control logic against the shared physical state and its
//! own private state: rules in order, `then` actions when the guard holds,
//! `otherwise` actions when it does not. Device effects go through the
//! contract-checked wrapper accessors, so a contract the offline prover
//! should have ruled out surfaces here as an error instead of silently
//! corrupting state.

use core::fmt;

use alloc::string::String;

use crate::expr::{eval, eval_bool, EvalCtx, EvalError};
use crate::model::{Action, AppModel, ContractError};
use crate::state::{AppState, PhysicalState, StateError};
use crate::types::WallClock;

/// Error executing an iteration
#[derive(Clone, Debug, PartialEq)]
pub enum LogicError {
    /// Action names a device instance the app does not own
    UnknownDevice {
        /// Instance name
        instance: String,
    },
    /// A wrapper method rejected its contract
    Contract {
        /// Instance name
        instance: String,
        /// Method name
        method: String,
        /// The underlying contract failure
        error: ContractError,
    },
    /// A field assignment was rejected
    State(StateError),
    /// A guard or assignment expression failed to evaluate
    Eval(EvalError),
}

impl fmt::Display for LogicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicError::UnknownDevice { instance } => {
                write!(f, "unknown device instance {}", instance)
            }
            LogicError::Contract {
                instance,
                method,
                error,
            } => write!(f, "device {}.{}: {}", instance, method, error),
            LogicError::State(e) => write!(f, "state write rejected: {}", e),
            LogicError::Eval(e) => write!(f, "evaluation failed: {}", e),
        }
    }
}

impl From<StateError> for LogicError {
    fn from(e: StateError) -> Self {
        LogicError::State(e)
    }
}

impl From<EvalError> for LogicError {
    fn from(e: EvalError) -> Self {
        LogicError::Eval(e)
    }
}

/// Execute one iteration of an app's control logic.
///
/// The single authoritative per-app entrypoint: the runtime invokes
/// nothing else on an app's behalf.
pub fn run_iteration(
    app: &AppModel,
    app_state: &mut AppState,
    physical: &mut PhysicalState,
    clock: &WallClock,
) -> Result<(), LogicError> {
    for rule in &app.iteration.rules {
        let guard_holds = {
            let ctx = EvalCtx {
                physical,
                app_state: Some(app_state),
                devices: &app.devices,
                clock,
                result: None,
            };
            eval_bool(&rule.when, &ctx)?
        };
        let actions = if guard_holds {
            &rule.then
        } else {
            &rule.otherwise
        };
        for action in actions {
            match action {
                Action::Invoke { instance, method } => {
                    let wrapper =
                        app.devices
                            .get(instance)
                            .ok_or_else(|| LogicError::UnknownDevice {
                                instance: instance.clone(),
                            })?;
                    wrapper
                        .invoke(method, physical, &app.devices, clock)
                        .map_err(|error| LogicError::Contract {
                            instance: instance.clone(),
                            method: method.clone(),
                            error,
                        })?;
                }
                Action::SetField { field, value } => {
                    let value = {
                        let ctx = EvalCtx {
                            physical,
                            app_state: Some(app_state),
                            devices: &app.devices,
                            clock,
                            result: None,
                        };
                        eval(value, &ctx)?
                    };
                    app_state.set(field, value)?;
                }
            }
        }
    }
    Ok(())
}
