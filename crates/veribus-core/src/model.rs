//! The merged verification model
//!
//! One artifact combines every app's state shape, device contracts,
//! invariant and control logic: the shared physical address shape, one
//! `AppModel` per app keyed by app name (the runtime discovers invariants
//! and iterations by that key), and per-instance device wrappers whose
//! class contracts have been substituted down to concrete group addresses.
//!
//! Every collection is a `BTreeMap`, so serializing a model is canonical:
//! identical inputs produce byte-identical artifacts.

use core::fmt;

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::expr::{eval_bool, EvalCtx, EvalError, Expr};
use crate::state::{PhysicalState, StateError};
use crate::types::{DatapointType, GroupAddress, Value, WallClock};

/// Declared shape of one physical datapoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddressSpec {
    /// Value type
    pub datapoint: DatapointType,
    /// Initial value
    pub default: Value,
}

impl AddressSpec {
    /// Spec with the type's standard default (false / 0 / 0.0 / "")
    pub fn defaulted(datapoint: DatapointType) -> Self {
        Self {
            datapoint,
            default: Value::default_for(datapoint),
        }
    }
}

/// Declared shape of one app-state field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Value type
    pub datapoint: DatapointType,
    /// Initial value
    pub default: Value,
}

impl FieldSpec {
    /// Spec with the type's standard default (false / 0 / 0.0 / "")
    pub fn defaulted(datapoint: DatapointType) -> Self {
        Self {
            datapoint,
            default: Value::default_for(datapoint),
        }
    }
}

/// Body of a device class method, over named address slots
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodBody {
    /// Read accessor: returns the slot's current value
    Read {
        /// Slot to read
        slot: String,
    },
    /// Command: writes a fixed value to the slot
    Write {
        /// Slot to write
        slot: String,
        /// Value written
        value: Value,
    },
}

/// A contract-annotated capability method of a device class.
///
/// The precondition is checked against pre-state; the postcondition
/// relates post-state and (for read accessors) the returned value via the
/// `Result` atom. Contracts are written over the class's slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    /// Precondition over pre-state; absent means `true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<Expr>,
    /// Postcondition over post-state and result; absent means `true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Expr>,
    /// What invoking the method does
    pub body: MethodBody,
}

/// A device class: a named set of contract-annotated methods
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceClass {
    /// Class name, referenced by device instances
    pub name: String,
    /// Methods by name
    pub methods: BTreeMap<String, MethodSpec>,
}

impl DeviceClass {
    /// All slots the class's bodies and contracts mention.
    pub fn slots(&self) -> BTreeSet<String> {
        let mut slots = BTreeSet::new();
        for method in self.methods.values() {
            match &method.body {
                MethodBody::Read { slot } | MethodBody::Write { slot, .. } => {
                    slots.insert(slot.clone());
                }
            }
            if let Some(pre) = &method.pre {
                collect_slots(pre, &mut slots);
            }
            if let Some(post) = &method.post {
                collect_slots(post, &mut slots);
            }
        }
        slots
    }
}

fn collect_slots(expr: &Expr, slots: &mut BTreeSet<String>) {
    match expr {
        Expr::Slot(name) => {
            slots.insert(name.clone());
        }
        Expr::Not(inner) => collect_slots(inner, slots),
        Expr::All(items) | Expr::Any(items) => {
            for item in items {
                collect_slots(item, slots);
            }
        }
        Expr::Cmp { lhs, rhs, .. } | Expr::Arith { lhs, rhs, .. } => {
            collect_slots(lhs, slots);
            collect_slots(rhs, slots);
        }
        _ => {}
    }
}

/// Body of a bound method: slots substituted with concrete addresses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundBody {
    /// Read accessor over a concrete datapoint
    Read {
        /// Backing datapoint
        address: GroupAddress,
    },
    /// Command writing a fixed value to a concrete datapoint
    Write {
        /// Target datapoint
        address: GroupAddress,
        /// Value written
        value: Value,
    },
}

/// A method of a device wrapper, contracts over concrete addresses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundMethod {
    /// Precondition over pre-state; absent means `true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<Expr>,
    /// Postcondition over post-state and result; absent means `true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Expr>,
    /// What invoking the method does
    pub body: BoundBody,
}

/// Error instantiating a device class for an instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindError {
    /// A slot the class mentions is not covered by the instance's bindings
    UnboundSlot {
        /// Slot name
        slot: String,
    },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::UnboundSlot { slot } => write!(f, "slot {} is not bound", slot),
        }
    }
}

/// Contract violation while invoking a wrapper method
#[derive(Clone, Debug, PartialEq)]
pub enum ContractError {
    /// Method not defined by the wrapper's class
    UnknownMethod {
        /// Method name
        method: String,
    },
    /// Precondition evaluated false against pre-state
    PreconditionFailed {
        /// Method name
        method: String,
    },
    /// Postcondition evaluated false against post-state and result
    PostconditionFailed {
        /// Method name
        method: String,
    },
    /// Body write rejected by the physical state
    State(StateError),
    /// Contract expression failed to evaluate
    Eval(EvalError),
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::UnknownMethod { method } => write!(f, "no method {}", method),
            ContractError::PreconditionFailed { method } => {
                write!(f, "precondition of {} failed", method)
            }
            ContractError::PostconditionFailed { method } => {
                write!(f, "postcondition of {} failed", method)
            }
            ContractError::State(e) => write!(f, "state write rejected: {}", e),
            ContractError::Eval(e) => write!(f, "contract evaluation failed: {}", e),
        }
    }
}

impl From<StateError> for ContractError {
    fn from(e: StateError) -> Self {
        ContractError::State(e)
    }
}

impl From<EvalError> for ContractError {
    fn from(e: EvalError) -> Self {
        ContractError::Eval(e)
    }
}

/// A named device instance: a class bound to concrete group addresses,
/// exposing contract-checked accessors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceWrapper {
    /// Class the instance was created from
    pub class: String,
    /// Slot to address bindings
    pub bindings: BTreeMap<String, GroupAddress>,
    /// Bound methods by name
    pub methods: BTreeMap<String, BoundMethod>,
}

impl DeviceWrapper {
    /// Instantiate a class for one device instance, substituting every
    /// slot with its bound address in bodies and contracts.
    pub fn bind(
        class: &DeviceClass,
        bindings: BTreeMap<String, GroupAddress>,
    ) -> Result<Self, BindError> {
        let mut methods = BTreeMap::new();
        for (name, spec) in &class.methods {
            let body = match &spec.body {
                MethodBody::Read { slot } => BoundBody::Read {
                    address: *bindings.get(slot).ok_or_else(|| BindError::UnboundSlot {
                        slot: slot.clone(),
                    })?,
                },
                MethodBody::Write { slot, value } => BoundBody::Write {
                    address: *bindings.get(slot).ok_or_else(|| BindError::UnboundSlot {
                        slot: slot.clone(),
                    })?,
                    value: value.clone(),
                },
            };
            let resolve = |contract: &Option<Expr>| -> Result<Option<Expr>, BindError> {
                contract.as_ref().map(|e| e.resolve_slots(&bindings)).transpose()
            };
            methods.insert(
                name.clone(),
                BoundMethod {
                    pre: resolve(&spec.pre)?,
                    post: resolve(&spec.post)?,
                    body,
                },
            );
        }
        Ok(Self {
            class: class.name.clone(),
            bindings,
            methods,
        })
    }

    /// Invoke a capability method: check the precondition against
    /// pre-state, apply the body, check the postcondition against
    /// post-state and result. Returns the read value for accessors,
    /// `None` for commands.
    pub fn invoke(
        &self,
        method: &str,
        physical: &mut PhysicalState,
        devices: &BTreeMap<String, DeviceWrapper>,
        clock: &WallClock,
    ) -> Result<Option<Value>, ContractError> {
        let bound = self
            .methods
            .get(method)
            .ok_or_else(|| ContractError::UnknownMethod {
                method: method.into(),
            })?;

        if let Some(pre) = &bound.pre {
            let ctx = EvalCtx {
                physical,
                app_state: None,
                devices,
                clock,
                result: None,
            };
            if !eval_bool(pre, &ctx)? {
                return Err(ContractError::PreconditionFailed {
                    method: method.into(),
                });
            }
        }

        let result = match &bound.body {
            BoundBody::Read { address } => Some(
                physical
                    .get(address)
                    .cloned()
                    .ok_or(EvalError::UnknownAddress(*address))?,
            ),
            BoundBody::Write { address, value } => {
                physical.set(*address, value.clone())?;
                None
            }
        };

        if let Some(post) = &bound.post {
            let ctx = EvalCtx {
                physical,
                app_state: None,
                devices,
                clock,
                result: result.as_ref(),
            };
            if !eval_bool(post, &ctx)? {
                return Err(ContractError::PostconditionFailed {
                    method: method.into(),
                });
            }
        }

        Ok(result)
    }
}

/// One step of an app's control logic
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Invoke a device capability method
    Invoke {
        /// Device instance name
        instance: String,
        /// Method name
        method: String,
    },
    /// Assign an expression to a field of the app's own state
    SetField {
        /// Field name
        field: String,
        /// Value expression
        value: Expr,
    },
}

/// One guarded rule of an app's iteration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Guard condition
    pub when: Expr,
    /// Actions when the guard holds
    pub then: Vec<Action>,
    /// Actions when it does not
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub otherwise: Vec<Action>,
}

/// An app's control logic: rules executed in order, each rule running its
/// `then` actions when its guard holds and its `otherwise` actions when it
/// does not. The single authoritative per-app entrypoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    /// Rules in execution order
    pub rules: Vec<Rule>,
}

/// Everything the model records about one app
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppModel {
    /// Declared private state shape
    pub state_shape: BTreeMap<String, FieldSpec>,
    /// Device wrappers by instance name
    pub devices: BTreeMap<String, DeviceWrapper>,
    /// Safety invariant over physical state, own state and ambient data
    pub invariant: Expr,
    /// Control logic
    pub iteration: Iteration,
}

/// The merged verification model: the artifact the generator emits and
/// both the offline prover and the runtime verifier consume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationModel {
    /// Shared physical state shape
    pub addresses: BTreeMap<GroupAddress, AddressSpec>,
    /// Per-app models, keyed by app name
    pub apps: BTreeMap<String, AppModel>,
}

impl VerificationModel {
    /// Build the live physical state from the shape, all defaults.
    pub fn physical_state(&self) -> PhysicalState {
        PhysicalState::from_shape(&self.addresses)
    }

    /// Declared datapoint type of an address, if declared.
    pub fn datapoint_type(&self, address: &GroupAddress) -> Option<DatapointType> {
        self.addresses.get(address).map(|spec| spec.datapoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CmpOp;
    use alloc::boxed::Box;
    use alloc::string::ToString;

    fn ga(sub: u8) -> GroupAddress {
        GroupAddress::new(0, 0, sub).unwrap()
    }

    /// Switch class: `on`/`off` commands with postconditions, `is_on` read
    /// accessor whose postcondition ties the result to the state slot.
    fn switch_class() -> DeviceClass {
        let mut methods = BTreeMap::new();
        methods.insert(
            "on".to_string(),
            MethodSpec {
                pre: None,
                post: Some(Expr::Cmp {
                    op: CmpOp::Eq,
                    lhs: Box::new(Expr::Slot("state".to_string())),
                    rhs: Box::new(Expr::Lit(Value::Bool(true))),
                }),
                body: MethodBody::Write {
                    slot: "state".to_string(),
                    value: Value::Bool(true),
                },
            },
        );
        methods.insert(
            "off".to_string(),
            MethodSpec {
                pre: None,
                post: Some(Expr::Cmp {
                    op: CmpOp::Eq,
                    lhs: Box::new(Expr::Slot("state".to_string())),
                    rhs: Box::new(Expr::Lit(Value::Bool(false))),
                }),
                body: MethodBody::Write {
                    slot: "state".to_string(),
                    value: Value::Bool(false),
                },
            },
        );
        methods.insert(
            "is_on".to_string(),
            MethodSpec {
                pre: None,
                post: Some(Expr::Cmp {
                    op: CmpOp::Eq,
                    lhs: Box::new(Expr::Slot("state".to_string())),
                    rhs: Box::new(Expr::Result),
                }),
                body: MethodBody::Read {
                    slot: "state".to_string(),
                },
            },
        );
        DeviceClass {
            name: "switch".to_string(),
            methods,
        }
    }

    fn bound_switch() -> DeviceWrapper {
        let mut bindings = BTreeMap::new();
        bindings.insert("state".to_string(), ga(2));
        DeviceWrapper::bind(&switch_class(), bindings).unwrap()
    }

    fn physical() -> PhysicalState {
        let mut shape = BTreeMap::new();
        shape.insert(ga(2), AddressSpec::defaulted(DatapointType::Bool));
        PhysicalState::from_shape(&shape)
    }

    // ========================================================================
    // Class slots and binding
    // ========================================================================

    #[test]
    fn test_class_slots_cover_bodies_and_contracts() {
        let slots = switch_class().slots();
        assert_eq!(slots.len(), 1);
        assert!(slots.contains("state"));
    }

    #[test]
    fn test_bind_substitutes_slots_everywhere() {
        let wrapper = bound_switch();
        assert_eq!(wrapper.class, "switch");

        let on = &wrapper.methods["on"];
        assert_eq!(
            on.body,
            BoundBody::Write {
                address: ga(2),
                value: Value::Bool(true),
            }
        );
        assert_eq!(
            on.post,
            Some(Expr::Cmp {
                op: CmpOp::Eq,
                lhs: Box::new(Expr::Address(ga(2))),
                rhs: Box::new(Expr::Lit(Value::Bool(true))),
            })
        );
    }

    #[test]
    fn test_bind_rejects_missing_slot() {
        let err = DeviceWrapper::bind(&switch_class(), BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            BindError::UnboundSlot {
                slot: "state".to_string()
            }
        );
    }

    // ========================================================================
    // Contract-checked invocation
    // ========================================================================

    #[test]
    fn test_invoke_command_and_accessor() {
        let wrapper = bound_switch();
        let mut physical = physical();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();

        assert_eq!(
            wrapper.invoke("is_on", &mut physical, &devices, &clock),
            Ok(Some(Value::Bool(false)))
        );
        assert_eq!(
            wrapper.invoke("on", &mut physical, &devices, &clock),
            Ok(None)
        );
        assert_eq!(physical.get(&ga(2)), Some(&Value::Bool(true)));
        assert_eq!(
            wrapper.invoke("is_on", &mut physical, &devices, &clock),
            Ok(Some(Value::Bool(true)))
        );
    }

    #[test]
    fn test_invoke_unknown_method() {
        let wrapper = bound_switch();
        let mut physical = physical();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();

        assert_eq!(
            wrapper.invoke("toggle", &mut physical, &devices, &clock),
            Err(ContractError::UnknownMethod {
                method: "toggle".to_string()
            })
        );
    }

    #[test]
    fn test_invoke_precondition_failure_leaves_state_unchanged() {
        // Command whose precondition requires the switch to be on first.
        let mut class = switch_class();
        class.methods.get_mut("off").unwrap().pre = Some(Expr::Slot("state".to_string()));
        let mut bindings = BTreeMap::new();
        bindings.insert("state".to_string(), ga(2));
        let wrapper = DeviceWrapper::bind(&class, bindings).unwrap();

        let mut physical = physical();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();

        let before = physical.clone();
        assert_eq!(
            wrapper.invoke("off", &mut physical, &devices, &clock),
            Err(ContractError::PreconditionFailed {
                method: "off".to_string()
            })
        );
        assert_eq!(physical, before);
    }

    #[test]
    fn test_invoke_detects_postcondition_violation() {
        // A broken command: writes false but promises true.
        let mut methods = BTreeMap::new();
        methods.insert(
            "on".to_string(),
            MethodSpec {
                pre: None,
                post: Some(Expr::Slot("state".to_string())),
                body: MethodBody::Write {
                    slot: "state".to_string(),
                    value: Value::Bool(false),
                },
            },
        );
        let class = DeviceClass {
            name: "broken_switch".to_string(),
            methods,
        };
        let mut bindings = BTreeMap::new();
        bindings.insert("state".to_string(), ga(2));
        let wrapper = DeviceWrapper::bind(&class, bindings).unwrap();

        let mut physical = physical();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();

        assert_eq!(
            wrapper.invoke("on", &mut physical, &devices, &clock),
            Err(ContractError::PostconditionFailed {
                method: "on".to_string()
            })
        );
    }
}
