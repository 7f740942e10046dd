//! Veribus Core - Pure Verification Model and Write-Check State Machine
//!
//! This crate contains the **pure, platform-free** verification core that
//! serves as the primary verification target for Veribus.
//!
//! # Design Principles
//!
//! 1. **No platform dependency**: process control, clocks and I/O live in
//!    `veribus-runtime`
//! 2. **No side effects**: pure state transformations only
//! 3. **Deterministic**: same input always produces same output, and the
//!    model serializes canonically (byte-identical artifacts)
//! 4. **Total over validated models**: every evaluation error is ruled out
//!    by `check_all_invariants` before an artifact is emitted
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       veribus-core                          │
//! │                  (Pure State Machine)                       │
//! │                                                             │
//! │   ┌───────────────┐    ┌────────────────┐                  │
//! │   │ Verification  │    │ verify_write() │                  │
//! │   │ Model         │───▶│ Pure write     │                  │
//! │   │ - addresses   │    │ verdict        │                  │
//! │   │ - app models  │    └────────────────┘                  │
//! │   └───────────────┘                                         │
//! │                                                             │
//! │   ┌───────────────┐    ┌────────────────┐                  │
//! │   │ Condition     │    │  Invariants    │                  │
//! │   │ Checker       │    │  Validation    │                  │
//! │   └───────────────┘    └────────────────┘                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              │ used by
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     veribus-runtime                         │
//! │                   (Runtime Wrapper)                         │
//! │                                                             │
//! │   - Journal recording and tracing diagnostics               │
//! │   - Process isolation capability                            │
//! │   - Wall clock source                                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - `types` - Bus and app types (GroupAddress, Value, Message, etc.)
//! - `expr` - Condition expression language and evaluator
//! - `state` - Shared physical state and per-app private state
//! - `model` - Device classes, wrappers and the merged model
//! - `registry` - Homogeneous app registry
//! - `conditions` - Merged invariant evaluation
//! - `step` - Pure `verify_write(state, message) -> outcome` function
//! - `invariants` - Structural model validation
//! - `logic` - App iteration execution

#![no_std]
extern crate alloc;

pub mod conditions;
pub mod expr;
pub mod invariants;
pub mod logic;
pub mod model;
pub mod registry;
pub mod state;
pub mod step;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export all public types for convenient access
pub use conditions::check_conditions;
pub use expr::{eval, eval_bool, ArithOp, CmpOp, EvalCtx, EvalError, Expr, TimeField};
pub use invariants::{check_all_invariants, check_state_conformance, InvariantViolation};
pub use logic::{run_iteration, LogicError};
pub use model::{
    Action, AddressSpec, AppModel, BindError, BoundBody, BoundMethod, ContractError, DeviceClass,
    DeviceWrapper, FieldSpec, Iteration, MethodBody, MethodSpec, Rule, VerificationModel,
};
pub use registry::{AppEntry, AppRegistry};
pub use state::{AppState, PhysicalState, StateError};
pub use step::{verify_write, WriteOutcome};
pub use types::{
    AddressParseError, AppName, AppStatus, DatapointType, GroupAddress, Message, ProcessId, Value,
    WallClock,
};
