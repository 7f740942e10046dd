//! Shared physical state and per-app private state
//!
//! Both maps are created from declared shapes with declared defaults and
//! keep their shape for their whole lifetime: a write can change a value
//! but never add a key or change a key's type. That discipline is what
//! makes "every value conforms to its declared type at all times" hold by
//! construction.

use core::fmt;

use alloc::collections::BTreeMap;
use alloc::string::String;
use serde::{Deserialize, Serialize};

use crate::model::{AddressSpec, FieldSpec};
use crate::types::{DatapointType, GroupAddress, Value};

/// Error from a typed state write
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// Address not part of the declared shape
    UnknownAddress(GroupAddress),
    /// Field not part of the declared shape
    UnknownField(String),
    /// Value type does not match the declared datapoint type
    TypeMismatch {
        /// Declared type
        expected: DatapointType,
        /// Type of the rejected value
        got: DatapointType,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::UnknownAddress(ga) => write!(f, "unknown group address {}", ga),
            StateError::UnknownField(name) => write!(f, "unknown app state field {}", name),
            StateError::TypeMismatch { expected, got } => {
                write!(f, "expected {} value, got {}", expected, got)
            }
        }
    }
}

/// The single shared mapping from group address to current value.
///
/// Exactly one live instance exists system-wide, owned by the runtime
/// verifier; it is mutated only through verified writes and device command
/// bodies, never handed out as a mutable reference to app logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalState {
    values: BTreeMap<GroupAddress, Value>,
}

impl PhysicalState {
    /// Create the state from the model's address shape, every datapoint at
    /// its declared default.
    pub fn from_shape(shape: &BTreeMap<GroupAddress, AddressSpec>) -> Self {
        let values = shape
            .iter()
            .map(|(address, spec)| (*address, spec.default.clone()))
            .collect();
        Self { values }
    }

    /// Current value of a datapoint
    pub fn get(&self, address: &GroupAddress) -> Option<&Value> {
        self.values.get(address)
    }

    /// Whether the address is part of the declared shape
    pub fn contains(&self, address: &GroupAddress) -> bool {
        self.values.contains_key(address)
    }

    /// Write a datapoint. Rejects unknown addresses and values of the
    /// wrong type, leaving the state unchanged.
    pub fn set(&mut self, address: GroupAddress, value: Value) -> Result<(), StateError> {
        let current = self
            .values
            .get_mut(&address)
            .ok_or(StateError::UnknownAddress(address))?;
        if current.datapoint_type() != value.datapoint_type() {
            return Err(StateError::TypeMismatch {
                expected: current.datapoint_type(),
                got: value.datapoint_type(),
            });
        }
        *current = value;
        Ok(())
    }

    /// Number of datapoints
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the shape is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate datapoints in address order
    pub fn iter(&self) -> impl Iterator<Item = (&GroupAddress, &Value)> {
        self.values.iter()
    }
}

/// One app's private state record.
///
/// Exclusively owned by its app: only the owning app's iteration actions
/// mutate it, and no other app may read it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    fields: BTreeMap<String, Value>,
}

impl AppState {
    /// Create the state from the app's declared field shape, every field at
    /// its declared default.
    pub fn from_shape(shape: &BTreeMap<String, FieldSpec>) -> Self {
        let fields = shape
            .iter()
            .map(|(name, spec)| (name.clone(), spec.default.clone()))
            .collect();
        Self { fields }
    }

    /// An app state with no fields, used for killed apps whose resources
    /// have been released.
    pub fn released() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Current value of a field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a field. Rejects unknown fields and values of the wrong type,
    /// leaving the state unchanged.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), StateError> {
        let current = self
            .fields
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownField(name.into()))?;
        if current.datapoint_type() != value.datapoint_type() {
            return Err(StateError::TypeMismatch {
                expected: current.datapoint_type(),
                got: value.datapoint_type(),
            });
        }
        *current = value;
        Ok(())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}
