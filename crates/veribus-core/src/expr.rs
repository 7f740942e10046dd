//! Condition expression language
//!
//! One small boolean expression language is shared by app invariants,
//! device method contracts and iteration guards. Expressions are pure
//! data (serde-serializable, `BTreeMap`-friendly) so the generator can
//! merge, substitute and validate them, and evaluation is total over
//! validated models: every error this module can produce is caught by
//! model validation before the runtime ever evaluates anything.

use core::fmt;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::model::{BindError, BoundBody, DeviceWrapper};
use crate::state::{AppState, PhysicalState};
use crate::types::{DatapointType, GroupAddress, Value, WallClock};

/// Comparison operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Arithmetic operator. Integer arithmetic wraps; there is no division,
/// which keeps evaluation total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
        };
        f.write_str(s)
    }
}

/// Ambient wall-clock field readable by conditions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    /// Hour of the day (0-23)
    Hour,
    /// Minute in the hour (0-59)
    Minute,
    /// Day of the week (1-7)
    DayOfWeek,
    /// Day of the month (1-31)
    DayOfMonth,
    /// Month in the year (1-12)
    Month,
    /// Calendar year
    Year,
}

/// A condition expression.
///
/// `Slot` atoms may only appear in device *class* contracts and are
/// substituted with concrete addresses when the generator binds a class to
/// an instance. `Result` may only appear in method postconditions, where it
/// denotes the value the accessor returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Literal value
    Lit(Value),
    /// Current value of a physical datapoint
    Address(GroupAddress),
    /// Current value of a field of the owning app's state
    Field(String),
    /// Invoke a device read accessor (contract-checked at iteration time,
    /// resolved to its backing datapoint here)
    Read {
        /// Device instance name
        instance: String,
        /// Accessor method name
        method: String,
    },
    /// Ambient wall-clock field
    Time(TimeField),
    /// The value returned by the method under check (postconditions only)
    Result,
    /// Named address slot of a device class (class contracts only)
    Slot(String),
    /// Logical negation
    Not(Box<Expr>),
    /// Conjunction; empty conjunction is true
    All(Vec<Expr>),
    /// Disjunction; empty disjunction is false
    Any(Vec<Expr>),
    /// Comparison
    Cmp {
        /// Operator
        op: CmpOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Numeric arithmetic
    Arith {
        /// Operator
        op: ArithOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Substitute every `Slot` atom with its bound group address.
    ///
    /// Used by the generator when instantiating a device class for a
    /// concrete instance. Fails on a slot the binding map does not cover.
    pub fn resolve_slots(
        &self,
        bindings: &BTreeMap<String, GroupAddress>,
    ) -> Result<Expr, BindError> {
        let resolved = match self {
            Expr::Slot(name) => {
                let address = bindings.get(name).ok_or_else(|| BindError::UnboundSlot {
                    slot: name.clone(),
                })?;
                Expr::Address(*address)
            }
            Expr::Not(inner) => Expr::Not(Box::new(inner.resolve_slots(bindings)?)),
            Expr::All(items) => Expr::All(
                items
                    .iter()
                    .map(|e| e.resolve_slots(bindings))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Expr::Any(items) => Expr::Any(
                items
                    .iter()
                    .map(|e| e.resolve_slots(bindings))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Expr::Cmp { op, lhs, rhs } => Expr::Cmp {
                op: *op,
                lhs: Box::new(lhs.resolve_slots(bindings)?),
                rhs: Box::new(rhs.resolve_slots(bindings)?),
            },
            Expr::Arith { op, lhs, rhs } => Expr::Arith {
                op: *op,
                lhs: Box::new(lhs.resolve_slots(bindings)?),
                rhs: Box::new(rhs.resolve_slots(bindings)?),
            },
            other => other.clone(),
        };
        Ok(resolved)
    }
}

/// Evaluation error.
///
/// Unreachable for a model that passed `check_all_invariants`; any
/// occurrence at runtime is a configuration defect, never an app fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalError {
    /// Address not present in the physical state
    UnknownAddress(GroupAddress),
    /// Field not present in the app state, or no app state in scope
    UnknownField(String),
    /// Device instance not present in the app's wrapper table
    UnknownDevice(String),
    /// Method not defined by the instance's class
    UnknownMethod {
        /// Device instance name
        instance: String,
        /// Method name
        method: String,
    },
    /// Method is a command, not a read accessor
    NotAReadAccessor {
        /// Device instance name
        instance: String,
        /// Method name
        method: String,
    },
    /// Slot atom survived generation
    UnresolvedSlot(String),
    /// `Result` atom outside a postcondition
    ResultOutOfScope,
    /// Condition position held a non-boolean value
    NotABool(DatapointType),
    /// Operands cannot be compared with this operator
    Incomparable {
        /// Operator
        op: CmpOp,
        /// Left operand type
        lhs: DatapointType,
        /// Right operand type
        rhs: DatapointType,
    },
    /// Arithmetic over non-numeric operands
    NonNumeric {
        /// Operator
        op: ArithOp,
        /// Left operand type
        lhs: DatapointType,
        /// Right operand type
        rhs: DatapointType,
    },
    /// Live app without a model entry (registry/model mismatch)
    UnknownApp(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownAddress(ga) => write!(f, "unknown group address {}", ga),
            EvalError::UnknownField(name) => write!(f, "unknown app state field {}", name),
            EvalError::UnknownDevice(name) => write!(f, "unknown device instance {}", name),
            EvalError::UnknownMethod { instance, method } => {
                write!(f, "device {} has no method {}", instance, method)
            }
            EvalError::NotAReadAccessor { instance, method } => {
                write!(f, "device method {}.{} is not a read accessor", instance, method)
            }
            EvalError::UnresolvedSlot(name) => write!(f, "unresolved slot {}", name),
            EvalError::ResultOutOfScope => f.write_str("result atom outside a postcondition"),
            EvalError::NotABool(datapoint) => {
                write!(f, "condition evaluated to {} instead of bool", datapoint)
            }
            EvalError::Incomparable { op, lhs, rhs } => {
                write!(f, "cannot compare {} {} {}", lhs, op, rhs)
            }
            EvalError::NonNumeric { op, lhs, rhs } => {
                write!(f, "cannot evaluate {} {} {}", lhs, op, rhs)
            }
            EvalError::UnknownApp(name) => write!(f, "no model entry for app {}", name),
        }
    }
}

/// Everything an expression may read. All references are shared; evaluation
/// never mutates state.
pub struct EvalCtx<'a> {
    /// Shared physical state
    pub physical: &'a PhysicalState,
    /// Owning app's private state; absent when checking device contracts
    pub app_state: Option<&'a AppState>,
    /// Owning app's device wrappers
    pub devices: &'a BTreeMap<String, DeviceWrapper>,
    /// Ambient calendar data
    pub clock: &'a WallClock,
    /// Method return value; present only while checking a postcondition
    pub result: Option<&'a Value>,
}

/// Evaluate an expression to a value.
pub fn eval(expr: &Expr, ctx: &EvalCtx<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Lit(value) => Ok(value.clone()),
        Expr::Address(address) => ctx
            .physical
            .get(address)
            .cloned()
            .ok_or(EvalError::UnknownAddress(*address)),
        Expr::Field(name) => ctx
            .app_state
            .and_then(|state| state.get(name))
            .cloned()
            .ok_or_else(|| EvalError::UnknownField(name.clone())),
        Expr::Read { instance, method } => {
            let wrapper = ctx
                .devices
                .get(instance)
                .ok_or_else(|| EvalError::UnknownDevice(instance.clone()))?;
            let bound = wrapper
                .methods
                .get(method)
                .ok_or_else(|| EvalError::UnknownMethod {
                    instance: instance.clone(),
                    method: method.clone(),
                })?;
            match &bound.body {
                BoundBody::Read { address } => ctx
                    .physical
                    .get(address)
                    .cloned()
                    .ok_or(EvalError::UnknownAddress(*address)),
                BoundBody::Write { .. } => Err(EvalError::NotAReadAccessor {
                    instance: instance.clone(),
                    method: method.clone(),
                }),
            }
        }
        Expr::Time(field) => {
            let v = match field {
                TimeField::Hour => ctx.clock.hour as i64,
                TimeField::Minute => ctx.clock.minute as i64,
                TimeField::DayOfWeek => ctx.clock.day_of_week as i64,
                TimeField::DayOfMonth => ctx.clock.day_of_month as i64,
                TimeField::Month => ctx.clock.month as i64,
                TimeField::Year => ctx.clock.year as i64,
            };
            Ok(Value::Int(v))
        }
        Expr::Result => ctx.result.cloned().ok_or(EvalError::ResultOutOfScope),
        Expr::Slot(name) => Err(EvalError::UnresolvedSlot(name.clone())),
        Expr::Not(inner) => Ok(Value::Bool(!eval_bool(inner, ctx)?)),
        Expr::All(items) => {
            for item in items {
                if !eval_bool(item, ctx)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Any(items) => {
            for item in items {
                if eval_bool(item, ctx)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::Cmp { op, lhs, rhs } => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            compare(*op, &lhs, &rhs)
        }
        Expr::Arith { op, lhs, rhs } => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            arith(*op, &lhs, &rhs)
        }
    }
}

/// Apply an arithmetic operator. Int pairs stay int (wrapping); any float
/// operand widens the result to float.
fn arith(op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let float = |a: f64, b: f64| match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
    };
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match op {
            ArithOp::Add => a.wrapping_add(*b),
            ArithOp::Sub => a.wrapping_sub(*b),
            ArithOp::Mul => a.wrapping_mul(*b),
        })),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float(*a, *b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float(*a as f64, *b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float(*a, *b as f64))),
        _ => Err(EvalError::NonNumeric {
            op,
            lhs: lhs.datapoint_type(),
            rhs: rhs.datapoint_type(),
        }),
    }
}

/// Evaluate an expression expected to be a condition.
pub fn eval_bool(expr: &Expr, ctx: &EvalCtx<'_>) -> Result<bool, EvalError> {
    match eval(expr, ctx)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::NotABool(other.datapoint_type())),
    }
}

/// Compare two values. Int and float compare numerically (mixed pairs are
/// widened to float); bool and string support equality only.
fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let outcome = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => cmp_int(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => cmp_float(op, *a, *b),
        (Value::Int(a), Value::Float(b)) => cmp_float(op, *a as f64, *b),
        (Value::Float(a), Value::Int(b)) => cmp_float(op, *a, *b as f64),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => return Err(incomparable(op, lhs, rhs)),
        },
        (Value::Str(a), Value::Str(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => return Err(incomparable(op, lhs, rhs)),
        },
        _ => return Err(incomparable(op, lhs, rhs)),
    };
    Ok(Value::Bool(outcome))
}

fn cmp_int(op: CmpOp, a: i64, b: i64) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

fn cmp_float(op: CmpOp, a: f64, b: f64) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

fn incomparable(op: CmpOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::Incomparable {
        op,
        lhs: lhs.datapoint_type(),
        rhs: rhs.datapoint_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    use crate::model::{AddressSpec, FieldSpec};
    use crate::types::DatapointType;

    fn ga(sub: u8) -> GroupAddress {
        GroupAddress::new(0, 0, sub).unwrap()
    }

    fn physical() -> PhysicalState {
        let mut shape = BTreeMap::new();
        shape.insert(ga(1), AddressSpec::defaulted(DatapointType::Bool));
        shape.insert(ga(2), AddressSpec::defaulted(DatapointType::Int));
        PhysicalState::from_shape(&shape)
    }

    fn app_state() -> AppState {
        let mut shape = BTreeMap::new();
        shape.insert("INT_0".to_string(), FieldSpec::defaulted(DatapointType::Int));
        AppState::from_shape(&shape)
    }

    fn ctx<'a>(
        physical: &'a PhysicalState,
        app_state: &'a AppState,
        devices: &'a BTreeMap<String, DeviceWrapper>,
        clock: &'a WallClock,
    ) -> EvalCtx<'a> {
        EvalCtx {
            physical,
            app_state: Some(app_state),
            devices,
            clock,
            result: None,
        }
    }

    // ========================================================================
    // Atom evaluation
    // ========================================================================

    #[test]
    fn test_eval_address_and_field() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        assert_eq!(
            eval(&Expr::Address(ga(1)), &ctx),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            eval(&Expr::Field("INT_0".to_string()), &ctx),
            Ok(Value::Int(0))
        );
        assert_eq!(
            eval(&Expr::Address(ga(9)), &ctx),
            Err(EvalError::UnknownAddress(ga(9)))
        );
        assert_eq!(
            eval(&Expr::Field("INT_9".to_string()), &ctx),
            Err(EvalError::UnknownField("INT_9".to_string()))
        );
    }

    #[test]
    fn test_eval_time_fields() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock {
            hour: 22,
            minute: 30,
            day_of_week: 5,
            day_of_month: 24,
            month: 12,
            year: 2024,
        };
        let ctx = ctx(&physical, &state, &devices, &clock);

        assert_eq!(eval(&Expr::Time(TimeField::Hour), &ctx), Ok(Value::Int(22)));
        assert_eq!(eval(&Expr::Time(TimeField::Year), &ctx), Ok(Value::Int(2024)));
    }

    #[test]
    fn test_result_atom_requires_postcondition_scope() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let mut ctx = ctx(&physical, &state, &devices, &clock);

        assert_eq!(eval(&Expr::Result, &ctx), Err(EvalError::ResultOutOfScope));

        let returned = Value::Bool(true);
        ctx.result = Some(&returned);
        assert_eq!(eval(&Expr::Result, &ctx), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_slot_atom_never_evaluates() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        assert_eq!(
            eval(&Expr::Slot("state".to_string()), &ctx),
            Err(EvalError::UnresolvedSlot("state".to_string()))
        );
    }

    // ========================================================================
    // Connectives and comparisons
    // ========================================================================

    #[test]
    fn test_empty_connectives() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        assert_eq!(eval_bool(&Expr::All(vec![]), &ctx), Ok(true));
        assert_eq!(eval_bool(&Expr::Any(vec![]), &ctx), Ok(false));
    }

    #[test]
    fn test_connective_short_circuit() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        // Second operand would error, but the first decides the outcome.
        let poisoned = Expr::Field("NOPE".to_string());
        assert_eq!(
            eval_bool(
                &Expr::All(vec![Expr::Lit(Value::Bool(false)), poisoned.clone()]),
                &ctx
            ),
            Ok(false)
        );
        assert_eq!(
            eval_bool(&Expr::Any(vec![Expr::Lit(Value::Bool(true)), poisoned]), &ctx),
            Ok(true)
        );
    }

    #[test]
    fn test_numeric_comparisons() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        let cmp = |op, lhs, rhs| Expr::Cmp {
            op,
            lhs: Box::new(Expr::Lit(lhs)),
            rhs: Box::new(Expr::Lit(rhs)),
        };

        assert_eq!(
            eval_bool(&cmp(CmpOp::Lt, Value::Int(1), Value::Int(2)), &ctx),
            Ok(true)
        );
        assert_eq!(
            eval_bool(&cmp(CmpOp::Ge, Value::Float(2.5), Value::Int(2)), &ctx),
            Ok(true)
        );
        assert_eq!(
            eval_bool(&cmp(CmpOp::Eq, Value::Int(3), Value::Float(3.0)), &ctx),
            Ok(true)
        );
    }

    #[test]
    fn test_bool_and_str_support_equality_only() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        let cmp = |op, lhs, rhs| Expr::Cmp {
            op,
            lhs: Box::new(Expr::Lit(lhs)),
            rhs: Box::new(Expr::Lit(rhs)),
        };

        assert_eq!(
            eval_bool(&cmp(CmpOp::Eq, Value::Bool(true), Value::Bool(true)), &ctx),
            Ok(true)
        );
        assert_eq!(
            eval_bool(
                &cmp(
                    CmpOp::Ne,
                    Value::Str("a".to_string()),
                    Value::Str("b".to_string())
                ),
                &ctx
            ),
            Ok(true)
        );
        assert_eq!(
            eval(&cmp(CmpOp::Lt, Value::Bool(false), Value::Bool(true)), &ctx),
            Err(EvalError::Incomparable {
                op: CmpOp::Lt,
                lhs: DatapointType::Bool,
                rhs: DatapointType::Bool,
            })
        );
        assert_eq!(
            eval(&cmp(CmpOp::Eq, Value::Bool(true), Value::Int(1)), &ctx),
            Err(EvalError::Incomparable {
                op: CmpOp::Eq,
                lhs: DatapointType::Bool,
                rhs: DatapointType::Int,
            })
        );
    }

    #[test]
    fn test_arithmetic() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        let arith = |op, lhs, rhs| Expr::Arith {
            op,
            lhs: Box::new(Expr::Lit(lhs)),
            rhs: Box::new(Expr::Lit(rhs)),
        };

        assert_eq!(
            eval(&arith(ArithOp::Add, Value::Int(1), Value::Int(2)), &ctx),
            Ok(Value::Int(3))
        );
        assert_eq!(
            eval(&arith(ArithOp::Sub, Value::Int(5), Value::Int(7)), &ctx),
            Ok(Value::Int(-2))
        );
        assert_eq!(
            eval(&arith(ArithOp::Mul, Value::Int(2), Value::Float(1.5)), &ctx),
            Ok(Value::Float(3.0))
        );
        assert_eq!(
            eval(
                &arith(ArithOp::Add, Value::Int(i64::MAX), Value::Int(1)),
                &ctx
            ),
            Ok(Value::Int(i64::MIN))
        );
        assert_eq!(
            eval(&arith(ArithOp::Add, Value::Bool(true), Value::Int(1)), &ctx),
            Err(EvalError::NonNumeric {
                op: ArithOp::Add,
                lhs: DatapointType::Bool,
                rhs: DatapointType::Int,
            })
        );
    }

    #[test]
    fn test_condition_position_must_be_bool() {
        let physical = physical();
        let state = app_state();
        let devices = BTreeMap::new();
        let clock = WallClock::epoch();
        let ctx = ctx(&physical, &state, &devices, &clock);

        assert_eq!(
            eval_bool(&Expr::Lit(Value::Int(1)), &ctx),
            Err(EvalError::NotABool(DatapointType::Int))
        );
        assert_eq!(
            eval(&Expr::Not(Box::new(Expr::Lit(Value::Int(1)))), &ctx),
            Err(EvalError::NotABool(DatapointType::Int))
        );
    }

    // ========================================================================
    // Slot substitution
    // ========================================================================

    #[test]
    fn test_resolve_slots_substitutes_recursively() {
        let mut bindings = BTreeMap::new();
        bindings.insert("state".to_string(), ga(1));

        let contract = Expr::Cmp {
            op: CmpOp::Eq,
            lhs: Box::new(Expr::Slot("state".to_string())),
            rhs: Box::new(Expr::Result),
        };
        let resolved = contract.resolve_slots(&bindings).unwrap();
        assert_eq!(
            resolved,
            Expr::Cmp {
                op: CmpOp::Eq,
                lhs: Box::new(Expr::Address(ga(1))),
                rhs: Box::new(Expr::Result),
            }
        );
    }

    #[test]
    fn test_resolve_slots_rejects_unbound_slot() {
        let bindings = BTreeMap::new();
        let contract = Expr::Not(Box::new(Expr::Slot("state".to_string())));
        assert_eq!(
            contract.resolve_slots(&bindings),
            Err(BindError::UnboundSlot {
                slot: "state".to_string()
            })
        );
    }
}
