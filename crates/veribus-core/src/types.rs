//! Core bus and app types
//!
//! This module contains the fundamental types used throughout the
//! verification core. All types here are pure data - no behavior that
//! depends on the host platform.

use core::fmt;
use core::str::FromStr;

use alloc::string::{String, ToString};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// App name - the identity apps are registered and isolated under
pub type AppName = String;

/// OS process identifier of a running app
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

/// App lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStatus {
    /// App is running and its invariant is part of the merged check
    Running,
    /// App has been isolated - terminal, no restart
    Killed,
}

/// Three-level bus group address (`main/middle/sub`).
///
/// Identifies one physical datapoint on the automation bus. Totally
/// ordered so it can key the physical state map; serialized as its
/// `main/middle/sub` string form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupAddress {
    /// Main group (0-31)
    pub main: u8,
    /// Middle group (0-7)
    pub middle: u8,
    /// Sub group (0-255)
    pub sub: u8,
}

impl GroupAddress {
    /// Maximum main group value
    pub const MAX_MAIN: u8 = 31;
    /// Maximum middle group value
    pub const MAX_MIDDLE: u8 = 7;

    /// Create a group address, rejecting out-of-range components.
    pub fn new(main: u8, middle: u8, sub: u8) -> Result<Self, AddressParseError> {
        if main > Self::MAX_MAIN {
            return Err(AddressParseError::MainOutOfRange(main));
        }
        if middle > Self::MAX_MIDDLE {
            return Err(AddressParseError::MiddleOutOfRange(middle));
        }
        Ok(Self { main, middle, sub })
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.main, self.middle, self.sub)
    }
}

/// Error parsing a `main/middle/sub` group address string
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressParseError {
    /// Not of the form `a/b/c`
    Malformed,
    /// A component is not a decimal number in range
    Component(String),
    /// Main group above 31
    MainOutOfRange(u8),
    /// Middle group above 7
    MiddleOutOfRange(u8),
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressParseError::Malformed => write!(f, "expected `main/middle/sub`"),
            AddressParseError::Component(c) => write!(f, "invalid address component `{}`", c),
            AddressParseError::MainOutOfRange(v) => write!(f, "main group {} above 31", v),
            AddressParseError::MiddleOutOfRange(v) => write!(f, "middle group {} above 7", v),
        }
    }
}

impl FromStr for GroupAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (a, b, c) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c), None) => (a, b, c),
            _ => return Err(AddressParseError::Malformed),
        };
        let parse = |p: &str| {
            p.parse::<u8>()
                .map_err(|_| AddressParseError::Component(p.to_string()))
        };
        GroupAddress::new(parse(a)?, parse(b)?, parse(c)?)
    }
}

impl Serialize for GroupAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GroupAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AddressVisitor;

        impl Visitor<'_> for AddressVisitor {
            type Value = GroupAddress;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a `main/middle/sub` group address string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<GroupAddress, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(AddressVisitor)
    }
}

/// Value type of one datapoint or app-state field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatapointType {
    /// Boolean datapoint
    Bool,
    /// Signed integer datapoint
    Int,
    /// Floating-point datapoint
    Float,
    /// String datapoint
    Str,
}

impl fmt::Display for DatapointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatapointType::Bool => "bool",
            DatapointType::Int => "int",
            DatapointType::Float => "float",
            DatapointType::Str => "str",
        };
        f.write_str(s)
    }
}

/// A typed datapoint or app-state value.
///
/// Serialized untagged, so manifests and artifacts carry plain JSON
/// literals (`true`, `42`, `1.5`, `"..."`); variant order resolves `42`
/// to an int before a float.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    Str(String),
}

impl Value {
    /// The declared type this value conforms to
    pub fn datapoint_type(&self) -> DatapointType {
        match self {
            Value::Bool(_) => DatapointType::Bool,
            Value::Int(_) => DatapointType::Int,
            Value::Float(_) => DatapointType::Float,
            Value::Str(_) => DatapointType::Str,
        }
    }

    /// The declared default for a datapoint type (false / 0 / 0.0 / "")
    pub fn default_for(datapoint: DatapointType) -> Self {
        match datapoint {
            DatapointType::Bool => Value::Bool(false),
            DatapointType::Int => Value::Int(0),
            DatapointType::Float => Value::Float(0.0),
            DatapointType::Str => Value::Str(String::new()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{:?}", v),
        }
    }
}

/// A bus write notification - the unit the runtime verifier consumes.
///
/// Wire shape: `{app_name, group_address, data}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// App whose action produced the write
    pub app_name: AppName,
    /// Target datapoint
    pub group_address: GroupAddress,
    /// New value
    pub data: Value,
}

/// Read-only ambient calendar data available to invariants and iterations.
///
/// Supplied by the runtime wrapper on every check; the core never reads a
/// clock itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallClock {
    /// Hour of the day (0-23)
    pub hour: u8,
    /// Minute in the hour (0-59)
    pub minute: u8,
    /// Day of the week (1 = Monday .. 7 = Sunday)
    pub day_of_week: u8,
    /// Day of the month (1-31)
    pub day_of_month: u8,
    /// Month in the year (1-12)
    pub month: u8,
    /// Calendar year
    pub year: u16,
}

impl WallClock {
    /// Midnight, Monday 1 January of year 0 - a fixed point for tests and
    /// models whose conditions never read the clock.
    pub fn epoch() -> Self {
        Self {
            hour: 0,
            minute: 0,
            day_of_week: 1,
            day_of_month: 1,
            month: 1,
            year: 0,
        }
    }
}
