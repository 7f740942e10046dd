//! Veribus Runtime - Live Write Verification and App Isolation
//!
//! Runtime half of Veribus: wraps the pure verification core
//! (`veribus-core`) with everything impure the live system needs.
//!
//! The verifier consumes bus write notifications as one serial stream,
//! applies each write to the single shared physical state, re-evaluates
//! the merged invariant of all live apps, and forcibly terminates the app
//! whose write broke it. Each message is processed as one atomic
//! update-then-check-then-isolate sequence; the verifier is the single
//! serialization point for the shared state.
//!
//! - `verifier` - the `RuntimeVerifier` message loop body
//! - `isolate` - `ProcessControl` capability and the idempotent `Isolator`
//! - `journal` - append-only verdict log for the audit trail
//! - `clock` - wall clock sources for ambient time in conditions
//!
//! The bus transport delivering the notifications and the supervisor
//! reporting app pids are external collaborators; this crate only defines
//! the interfaces it consumes them through.

pub mod clock;
pub mod isolate;
pub mod journal;
pub mod verifier;

pub use clock::{ClockSource, FixedClock, SystemClock};
pub use isolate::{
    IsolateError, Isolator, ProcessControl, RecordingProcessControl, SystemProcessControl,
};
pub use journal::{EventId, Journal, JournalEntry, JournalEvent};
pub use verifier::{RejectReason, RuntimeVerifier, Verdict};
