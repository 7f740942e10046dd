//! Wall clock sources
//!
//! Invariants and iterations may read ambient calendar data; the runtime
//! samples it once per processed message so every condition in one check
//! sees the same instant.

use chrono::{Datelike, Local, Timelike};

use veribus_core::WallClock;

/// Source of ambient calendar data
pub trait ClockSource {
    /// The current wall clock
    fn now(&self) -> WallClock;
}

/// Local system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> WallClock {
        let now = Local::now();
        WallClock {
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            day_of_week: now.weekday().number_from_monday() as u8,
            day_of_month: now.day() as u8,
            month: now.month() as u8,
            year: now.year() as u16,
        }
    }
}

/// Fixed clock for tests and replay
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub WallClock);

impl ClockSource for FixedClock {
    fn now(&self) -> WallClock {
        self.0
    }
}
