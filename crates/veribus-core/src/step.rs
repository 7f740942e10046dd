//! Pure write verification step
//!
//! `verify_write` is the heart of the runtime: one bus write in, one
//! verdict out. It mutates nothing but the physical state and performs no
//! I/O - the runtime wrapper owns journaling, tracing and isolation, so
//! the decision itself stays a verification target.
//!
//! Per message:
//! 1. Reject writes to undeclared addresses (fail closed, state unchanged).
//! 2. Reject values of the wrong datapoint type (fail closed).
//! 3. Apply the write.
//! 4. Re-evaluate the merged invariant of all live apps.
//! 5. Report a violation against the app named in the message - the write
//!    stays applied; terminating that app is the wrapper's job.
//!
//! An evaluation error is a configuration defect: no app is blamed.

use crate::conditions::check_conditions;
use crate::expr::EvalError;
use crate::model::VerificationModel;
use crate::registry::AppRegistry;
use crate::state::{PhysicalState, StateError};
use crate::types::{AppName, DatapointType, GroupAddress, Message, WallClock};

/// Verdict of one processed write
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOutcome {
    /// Write applied, merged invariant still holds
    Accepted,
    /// Address not declared; state unchanged
    UnknownAddress {
        /// The undeclared address
        address: GroupAddress,
    },
    /// Value type does not match the declared datapoint type; state
    /// unchanged
    TypeMismatch {
        /// Target address
        address: GroupAddress,
        /// Declared type
        expected: DatapointType,
        /// Type carried by the message
        got: DatapointType,
    },
    /// Write applied and the merged invariant is now false; the named app
    /// (the message's originator) must be isolated
    Violation {
        /// App to isolate
        app: AppName,
    },
    /// Invariant evaluation failed - configuration defect, nobody is
    /// isolated
    Fault {
        /// The evaluation error
        error: EvalError,
    },
}

/// Process one bus write against the shared physical state.
pub fn verify_write(
    model: &VerificationModel,
    registry: &AppRegistry,
    physical: &mut PhysicalState,
    message: &Message,
    clock: &WallClock,
) -> WriteOutcome {
    match physical.set(message.group_address, message.data.clone()) {
        Ok(()) => {}
        Err(StateError::TypeMismatch { expected, got }) => {
            return WriteOutcome::TypeMismatch {
                address: message.group_address,
                expected,
                got,
            };
        }
        // Physical writes fail only on unknown addresses or type
        // mismatches.
        Err(_) => {
            return WriteOutcome::UnknownAddress {
                address: message.group_address,
            };
        }
    }

    match check_conditions(model, registry, physical, clock) {
        Ok(true) => WriteOutcome::Accepted,
        Ok(false) => WriteOutcome::Violation {
            app: message.app_name.clone(),
        },
        Err(error) => WriteOutcome::Fault { error },
    }
}

// ============================================================================
// Kani proofs for the step function
// ============================================================================

#[cfg(kani)]
mod proofs {
    use super::*;
    use crate::model::AddressSpec;
    use crate::types::Value;
    use alloc::collections::BTreeMap;
    use alloc::string::ToString;

    /// Proof: a write to an undeclared address never changes the state.
    #[kani::proof]
    #[kani::unwind(5)]
    fn unknown_address_is_fail_closed() {
        let declared = GroupAddress { main: 0, middle: 0, sub: 1 };
        let mut shape = BTreeMap::new();
        shape.insert(declared, AddressSpec::defaulted(DatapointType::Bool));

        let model = VerificationModel {
            addresses: shape.clone(),
            apps: BTreeMap::new(),
        };
        let registry = AppRegistry::new();
        let mut physical = PhysicalState::from_shape(&shape);
        let before = physical.clone();

        let sub: u8 = kani::any();
        kani::assume(sub != 1);
        let message = Message {
            app_name: "app".to_string(),
            group_address: GroupAddress { main: 0, middle: 0, sub },
            data: Value::Bool(true),
        };

        let outcome = verify_write(
            &model,
            &registry,
            &mut physical,
            &message,
            &WallClock::epoch(),
        );
        kani::assert(
            matches!(outcome, WriteOutcome::UnknownAddress { .. }),
            "undeclared address must be rejected",
        );
        kani::assert(physical == before, "rejected write must not change state");
    }

    /// Proof: a violation always names the app carried in the message.
    #[kani::proof]
    #[kani::unwind(5)]
    fn violation_names_the_originator() {
        let address = GroupAddress { main: 0, middle: 0, sub: 1 };
        let mut shape = BTreeMap::new();
        shape.insert(address, AddressSpec::defaulted(DatapointType::Bool));

        // One app whose invariant forbids the datapoint being true.
        let mut apps = BTreeMap::new();
        apps.insert(
            "guard".to_string(),
            crate::model::AppModel {
                state_shape: BTreeMap::new(),
                devices: BTreeMap::new(),
                invariant: crate::expr::Expr::Not(alloc::boxed::Box::new(
                    crate::expr::Expr::Address(address),
                )),
                iteration: crate::model::Iteration { rules: alloc::vec::Vec::new() },
            },
        );
        let model = VerificationModel { addresses: shape.clone(), apps };
        let registry = AppRegistry::from_model(&model, &BTreeMap::new());
        let mut physical = PhysicalState::from_shape(&shape);

        let message = Message {
            app_name: "writer".to_string(),
            group_address: address,
            data: Value::Bool(true),
        };
        let outcome = verify_write(
            &model,
            &registry,
            &mut physical,
            &message,
            &WallClock::epoch(),
        );
        kani::assert(
            matches!(outcome, WriteOutcome::Violation { ref app } if app == "writer"),
            "the message's app is the one isolated",
        );
    }
}
