//! Verifier journal
//!
//! Records one event per processed message (and per isolation attempt)
//! for the audit trail. Append-only with monotonic ids; bounded, trimming
//! oldest entries first.

use serde::{Deserialize, Serialize};

use veribus_core::{AppName, GroupAddress};

/// Journal event id (monotonic)
pub type EventId = u64;

/// What happened while processing one message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JournalEvent {
    /// Write applied, merged invariant held
    WriteAccepted {
        /// Originating app
        app: AppName,
        /// Target datapoint
        address: GroupAddress,
    },
    /// Write rejected fail-closed, state unchanged
    WriteRejected {
        /// Originating app
        app: AppName,
        /// Target datapoint
        address: GroupAddress,
        /// Why the write was rejected
        reason: String,
    },
    /// Write applied, merged invariant broke, app isolated
    AppIsolated {
        /// Isolated app
        app: AppName,
        /// Datapoint whose write triggered the violation
        address: GroupAddress,
    },
    /// Isolation was required but termination failed
    IsolationFailed {
        /// App that should have been isolated
        app: AppName,
        /// Failure detail
        detail: String,
    },
    /// Invariant evaluation failed - configuration defect
    EvaluationFault {
        /// App named in the triggering message
        app: AppName,
        /// Fault detail
        detail: String,
    },
}

/// A journal record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry id (monotonic)
    pub id: EventId,
    /// The recorded event
    pub event: JournalEvent,
}

/// Maximum number of entries to keep in memory
const MAX_JOURNAL_ENTRIES: usize = 10000;

/// Append-only verdict log.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    next_id: EventId,
}

impl Journal {
    /// Create a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event, returning its id.
    pub fn record(&mut self, event: JournalEvent) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(JournalEntry { id, event });
        self.trim_if_needed();
        id
    }

    /// All retained entries.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// The most recent N entries, newest first.
    pub fn recent(&self, count: usize) -> Vec<&JournalEntry> {
        self.entries.iter().rev().take(count).collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The next entry id.
    pub fn next_id(&self) -> EventId {
        self.next_id
    }

    /// Trim old entries if exceeding max capacity.
    fn trim_if_needed(&mut self) {
        if self.entries.len() > MAX_JOURNAL_ENTRIES {
            let drain_count = self.entries.len() - MAX_JOURNAL_ENTRIES;
            self.entries.drain(0..drain_count);
        }
    }
}
