//! Runtime verifier
//!
//! Consumes bus write notifications in order, applies each to the shared
//! physical state, re-evaluates the merged invariant and enforces the
//! verdict. The pure decision lives in `veribus_core::verify_write`; this
//! wrapper owns everything impure around it: the single live physical
//! state, the app registry, the isolation capability, the journal and the
//! clock.
//!
//! `process` takes `&mut self`, so one message's update-then-check-then-
//! isolate sequence completes before the next is accepted: the verifier is
//! the single serialization point the shared state requires. If ingestion
//! is ever parallelized, all writes must still funnel through one
//! verifier.

use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use veribus_core::{
    verify_write, AppName, AppRegistry, DatapointType, EvalError, GroupAddress, Message,
    PhysicalState, ProcessId, VerificationModel, WriteOutcome,
};

use crate::clock::ClockSource;
use crate::isolate::{Isolator, ProcessControl};
use crate::journal::{Journal, JournalEvent};

/// Why a write was rejected fail-closed
#[derive(Clone, Debug, PartialEq)]
pub enum RejectReason {
    /// Address not declared in the model
    UnknownAddress {
        /// The undeclared address
        address: GroupAddress,
    },
    /// Value type does not match the declared datapoint type
    TypeMismatch {
        /// Target address
        address: GroupAddress,
        /// Declared type
        expected: DatapointType,
        /// Type carried by the message
        got: DatapointType,
    },
}

/// Outcome of processing one message
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Write applied, merged invariant holds
    Accepted,
    /// Write rejected, state unchanged
    Rejected(RejectReason),
    /// Write applied, invariant broke, the named app was isolated
    Isolated {
        /// The isolated app
        app: AppName,
    },
    /// Invariant evaluation failed - configuration defect, nobody isolated
    Fault {
        /// The evaluation error
        error: EvalError,
    },
}

/// The live verifier: one per bus.
pub struct RuntimeVerifier<P: ProcessControl, C: ClockSource> {
    model: VerificationModel,
    registry: AppRegistry,
    physical: PhysicalState,
    isolator: Isolator<P>,
    clock: C,
    journal: Journal,
}

impl<P: ProcessControl, C: ClockSource> RuntimeVerifier<P, C> {
    /// Build a verifier from a generated model: physical state and app
    /// registry at their declared defaults, pids as reported by the
    /// supervisor.
    pub fn new(
        model: VerificationModel,
        pids: BTreeMap<AppName, ProcessId>,
        control: P,
        clock: C,
    ) -> Self {
        let physical = model.physical_state();
        let registry = AppRegistry::from_model(&model, &pids);
        Self {
            model,
            registry,
            physical,
            isolator: Isolator::new(control, pids),
            clock,
            journal: Journal::new(),
        }
    }

    /// Process one bus write notification.
    ///
    /// Atomic per message: the write, the merged check and any isolation
    /// complete before this returns.
    pub fn process(&mut self, message: &Message) -> Verdict {
        let clock = self.clock.now();
        let outcome = verify_write(
            &self.model,
            &self.registry,
            &mut self.physical,
            message,
            &clock,
        );

        match outcome {
            WriteOutcome::Accepted => {
                debug!(
                    app = %message.app_name,
                    address = %message.group_address,
                    "write accepted"
                );
                self.journal.record(JournalEvent::WriteAccepted {
                    app: message.app_name.clone(),
                    address: message.group_address,
                });
                Verdict::Accepted
            }
            WriteOutcome::UnknownAddress { address } => {
                warn!(
                    app = %message.app_name,
                    address = %address,
                    "rejected write to unknown group address"
                );
                self.journal.record(JournalEvent::WriteRejected {
                    app: message.app_name.clone(),
                    address,
                    reason: format!("unknown group address {address}"),
                });
                Verdict::Rejected(RejectReason::UnknownAddress { address })
            }
            WriteOutcome::TypeMismatch {
                address,
                expected,
                got,
            } => {
                warn!(
                    app = %message.app_name,
                    address = %address,
                    %expected,
                    %got,
                    "rejected write with mismatched datapoint type"
                );
                self.journal.record(JournalEvent::WriteRejected {
                    app: message.app_name.clone(),
                    address,
                    reason: format!("expected {expected} value, got {got}"),
                });
                Verdict::Rejected(RejectReason::TypeMismatch {
                    address,
                    expected,
                    got,
                })
            }
            WriteOutcome::Violation { app } => {
                error!(
                    app = %app,
                    address = %message.group_address,
                    "write violated the merged invariant, isolating app"
                );
                self.registry.kill(&app);
                match self.isolator.isolate(&app) {
                    Ok(()) => {
                        self.journal.record(JournalEvent::AppIsolated {
                            app: app.clone(),
                            address: message.group_address,
                        });
                    }
                    Err(e) => {
                        // Logged and journaled; the stream continues.
                        self.journal.record(JournalEvent::IsolationFailed {
                            app: app.clone(),
                            detail: e.to_string(),
                        });
                    }
                }
                Verdict::Isolated { app }
            }
            WriteOutcome::Fault { error } => {
                // Cannot safely decide which app is at fault: isolate
                // nobody, surface loudly.
                error!(
                    app = %message.app_name,
                    address = %message.group_address,
                    "invariant evaluation failed, configuration defect: {error}"
                );
                self.journal.record(JournalEvent::EvaluationFault {
                    app: message.app_name.clone(),
                    detail: error.to_string(),
                });
                Verdict::Fault { error }
            }
        }
    }

    /// The verification model in force
    pub fn model(&self) -> &VerificationModel {
        &self.model
    }

    /// The current physical state (read-only; all mutation goes through
    /// `process`)
    pub fn physical(&self) -> &PhysicalState {
        &self.physical
    }

    /// The app registry
    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    /// The audit journal
    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}
