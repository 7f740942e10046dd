//! Structural model invariants
//!
//! Runtime-checkable invariants over the merged verification model and the
//! live runtime state. The generator runs `check_all_invariants` before
//! emitting an artifact, which is what makes condition evaluation total at
//! runtime: every reference resolves, every expression type-checks, no
//! class-level slot atom survives generation.
//!
//! # Invariants
//!
//! 1. **Default Conformance**: every declared default matches its type
//! 2. **Address Completeness**: wrapper-referenced addresses are declared,
//!    and every declared address is referenced somewhere
//! 3. **Invariant Typing**: every app invariant is a well-typed condition
//! 4. **Contract Typing**: every device contract is a well-typed condition
//!    over physical state (and the result atom in postconditions)
//! 5. **Iteration Typing**: every guard is a condition, every action
//!    resolves, every field assignment preserves the field's type

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::expr::{CmpOp, Expr};
use crate::model::{
    Action, AddressSpec, AppModel, BoundBody, DeviceWrapper, FieldSpec, VerificationModel,
};
use crate::registry::AppRegistry;
use crate::state::PhysicalState;
use crate::types::{DatapointType, GroupAddress};

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all model invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants(model: &VerificationModel) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_default_conformance(model));
    violations.extend(check_address_completeness(model));
    violations.extend(check_invariant_typing(model));
    violations.extend(check_contract_typing(model));
    violations.extend(check_iteration_typing(model));

    violations
}

/// Invariant 1: every declared default matches its datapoint type
fn check_default_conformance(model: &VerificationModel) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (address, spec) in &model.addresses {
        if spec.default.datapoint_type() != spec.datapoint {
            violations.push(InvariantViolation {
                invariant: "default_conformance",
                description: format!(
                    "address {} declared {} but defaults to {}",
                    address,
                    spec.datapoint,
                    spec.default.datapoint_type()
                ),
            });
        }
    }

    for (app_name, app) in &model.apps {
        for (field, spec) in &app.state_shape {
            if spec.default.datapoint_type() != spec.datapoint {
                violations.push(InvariantViolation {
                    invariant: "default_conformance",
                    description: format!(
                        "app {} field {} declared {} but defaults to {}",
                        app_name,
                        field,
                        spec.datapoint,
                        spec.default.datapoint_type()
                    ),
                });
            }
        }
    }

    violations
}

/// Invariant 2: wrapper addresses are declared and declared addresses are
/// referenced (by a wrapper binding or an expression atom)
fn check_address_completeness(model: &VerificationModel) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut referenced: BTreeSet<GroupAddress> = BTreeSet::new();

    for (app_name, app) in &model.apps {
        for (instance, wrapper) in &app.devices {
            for (slot, address) in &wrapper.bindings {
                referenced.insert(*address);
                if !model.addresses.contains_key(address) {
                    violations.push(InvariantViolation {
                        invariant: "address_completeness",
                        description: format!(
                            "app {} device {} binds slot {} to undeclared address {}",
                            app_name, instance, slot, address
                        ),
                    });
                }
            }
            for method in wrapper.methods.values() {
                let address = match &method.body {
                    BoundBody::Read { address } | BoundBody::Write { address, .. } => address,
                };
                referenced.insert(*address);
            }
        }
        collect_addresses(&app.invariant, &mut referenced);
        for rule in &app.iteration.rules {
            collect_addresses(&rule.when, &mut referenced);
            for action in rule.then.iter().chain(&rule.otherwise) {
                if let Action::SetField { value, .. } = action {
                    collect_addresses(value, &mut referenced);
                }
            }
        }
    }

    for address in model.addresses.keys() {
        if !referenced.contains(address) {
            violations.push(InvariantViolation {
                invariant: "address_completeness",
                description: format!("declared address {} is referenced by no app", address),
            });
        }
    }

    violations
}

fn collect_addresses(expr: &Expr, addresses: &mut BTreeSet<GroupAddress>) {
    match expr {
        Expr::Address(address) => {
            addresses.insert(*address);
        }
        Expr::Not(inner) => collect_addresses(inner, addresses),
        Expr::All(items) | Expr::Any(items) => {
            for item in items {
                collect_addresses(item, addresses);
            }
        }
        Expr::Cmp { lhs, rhs, .. } | Expr::Arith { lhs, rhs, .. } => {
            collect_addresses(lhs, addresses);
            collect_addresses(rhs, addresses);
        }
        _ => {}
    }
}

/// Invariant 3: app invariants are well-typed conditions
fn check_invariant_typing(model: &VerificationModel) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (app_name, app) in &model.apps {
        let scope = ExprScope {
            addresses: &model.addresses,
            fields: Some(&app.state_shape),
            devices: Some(&app.devices),
            result: None,
        };
        if let Err(description) = expect_condition(&app.invariant, &scope) {
            violations.push(InvariantViolation {
                invariant: "invariant_typing",
                description: format!("app {} invariant: {}", app_name, description),
            });
        }
    }

    violations
}

/// Invariant 4: device contracts are well-typed conditions over physical
/// state only
fn check_contract_typing(model: &VerificationModel) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (app_name, app) in &model.apps {
        for (instance, wrapper) in &app.devices {
            for (method_name, method) in &wrapper.methods {
                let mut report = |kind: &str, description: String| {
                    violations.push(InvariantViolation {
                        invariant: "contract_typing",
                        description: format!(
                            "app {} device {} method {} {}: {}",
                            app_name, instance, method_name, kind, description
                        ),
                    });
                };

                let pre_scope = ExprScope {
                    addresses: &model.addresses,
                    fields: None,
                    devices: None,
                    result: None,
                };
                if let Some(pre) = &method.pre {
                    if let Err(description) = expect_condition(pre, &pre_scope) {
                        report("precondition", description);
                    }
                }

                let result = match &method.body {
                    BoundBody::Read { address } => {
                        model.addresses.get(address).map(|spec| spec.datapoint)
                    }
                    BoundBody::Write { .. } => None,
                };
                let post_scope = ExprScope {
                    addresses: &model.addresses,
                    fields: None,
                    devices: None,
                    result,
                };
                if let Some(post) = &method.post {
                    if let Err(description) = expect_condition(post, &post_scope) {
                        report("postcondition", description);
                    }
                }
            }
        }
    }

    violations
}

/// Invariant 5: iteration guards and actions resolve and type-check
fn check_iteration_typing(model: &VerificationModel) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (app_name, app) in &model.apps {
        let scope = ExprScope {
            addresses: &model.addresses,
            fields: Some(&app.state_shape),
            devices: Some(&app.devices),
            result: None,
        };
        for (rule_index, rule) in app.iteration.rules.iter().enumerate() {
            if let Err(description) = expect_condition(&rule.when, &scope) {
                violations.push(InvariantViolation {
                    invariant: "iteration_typing",
                    description: format!(
                        "app {} rule {} guard: {}",
                        app_name, rule_index, description
                    ),
                });
            }
            for action in rule.then.iter().chain(&rule.otherwise) {
                if let Err(description) = check_action(action, app, &scope) {
                    violations.push(InvariantViolation {
                        invariant: "iteration_typing",
                        description: format!(
                            "app {} rule {}: {}",
                            app_name, rule_index, description
                        ),
                    });
                }
            }
        }
    }

    violations
}

fn check_action(action: &Action, app: &AppModel, scope: &ExprScope<'_>) -> Result<(), String> {
    match action {
        Action::Invoke { instance, method } => {
            let wrapper = app
                .devices
                .get(instance)
                .ok_or_else(|| format!("unknown device instance {}", instance))?;
            if !wrapper.methods.contains_key(method) {
                return Err(format!("device {} has no method {}", instance, method));
            }
            Ok(())
        }
        Action::SetField { field, value } => {
            let spec = app
                .state_shape
                .get(field)
                .ok_or_else(|| format!("unknown app state field {}", field))?;
            let datapoint = infer(value, scope)?;
            if datapoint != spec.datapoint {
                return Err(format!(
                    "field {} declared {} but assigned {}",
                    field, spec.datapoint, datapoint
                ));
            }
            Ok(())
        }
    }
}

// ============================================================================
// Expression typing
// ============================================================================

/// What an expression may reference in a given position
struct ExprScope<'a> {
    addresses: &'a BTreeMap<GroupAddress, AddressSpec>,
    /// App state fields; out of scope inside device contracts
    fields: Option<&'a BTreeMap<String, FieldSpec>>,
    /// Device wrappers; out of scope inside device contracts
    devices: Option<&'a BTreeMap<String, DeviceWrapper>>,
    /// Result type; in scope only in read-accessor postconditions
    result: Option<DatapointType>,
}

fn expect_condition(expr: &Expr, scope: &ExprScope<'_>) -> Result<(), String> {
    match infer(expr, scope)? {
        DatapointType::Bool => Ok(()),
        other => Err(format!("condition has type {} instead of bool", other)),
    }
}

/// Infer the type of an expression, or describe why it is ill-formed.
fn infer(expr: &Expr, scope: &ExprScope<'_>) -> Result<DatapointType, String> {
    match expr {
        Expr::Lit(value) => Ok(value.datapoint_type()),
        Expr::Address(address) => scope
            .addresses
            .get(address)
            .map(|spec| spec.datapoint)
            .ok_or_else(|| format!("undeclared address {}", address)),
        Expr::Field(name) => scope
            .fields
            .ok_or_else(|| format!("field {} referenced where app state is out of scope", name))?
            .get(name)
            .map(|spec| spec.datapoint)
            .ok_or_else(|| format!("undeclared field {}", name)),
        Expr::Read { instance, method } => {
            let devices = scope.devices.ok_or_else(|| {
                format!("device {} referenced where devices are out of scope", instance)
            })?;
            let wrapper = devices
                .get(instance)
                .ok_or_else(|| format!("unknown device instance {}", instance))?;
            let bound = wrapper
                .methods
                .get(method)
                .ok_or_else(|| format!("device {} has no method {}", instance, method))?;
            match &bound.body {
                BoundBody::Read { address } => scope
                    .addresses
                    .get(address)
                    .map(|spec| spec.datapoint)
                    .ok_or_else(|| format!("undeclared address {}", address)),
                BoundBody::Write { .. } => Err(format!(
                    "method {}.{} is a command, not a read accessor",
                    instance, method
                )),
            }
        }
        Expr::Time(_) => Ok(DatapointType::Int),
        Expr::Result => scope
            .result
            .ok_or_else(|| String::from("result atom outside a read-accessor postcondition")),
        Expr::Slot(name) => Err(format!("unresolved slot {}", name)),
        Expr::Not(inner) => {
            expect_condition(inner, scope)?;
            Ok(DatapointType::Bool)
        }
        Expr::All(items) | Expr::Any(items) => {
            for item in items {
                expect_condition(item, scope)?;
            }
            Ok(DatapointType::Bool)
        }
        Expr::Cmp { op, lhs, rhs } => {
            let lhs = infer(lhs, scope)?;
            let rhs = infer(rhs, scope)?;
            let numeric = |t: DatapointType| {
                matches!(t, DatapointType::Int | DatapointType::Float)
            };
            let comparable = if numeric(lhs) && numeric(rhs) {
                true
            } else {
                lhs == rhs && matches!(op, CmpOp::Eq | CmpOp::Ne)
            };
            if comparable {
                Ok(DatapointType::Bool)
            } else {
                Err(format!("cannot compare {} {} {}", lhs, op, rhs))
            }
        }
        Expr::Arith { op, lhs, rhs } => {
            let lhs = infer(lhs, scope)?;
            let rhs = infer(rhs, scope)?;
            match (lhs, rhs) {
                (DatapointType::Int, DatapointType::Int) => Ok(DatapointType::Int),
                (DatapointType::Int | DatapointType::Float, DatapointType::Int | DatapointType::Float) => {
                    Ok(DatapointType::Float)
                }
                _ => Err(format!("cannot evaluate {} {} {}", lhs, op, rhs)),
            }
        }
    }
}

// ============================================================================
// Runtime state conformance
// ============================================================================

/// Check the live runtime state against the model: the physical state has
/// exactly the declared shape, every live app has a model entry and its
/// state matches its declared shape.
pub fn check_state_conformance(
    model: &VerificationModel,
    registry: &AppRegistry,
    physical: &PhysicalState,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (address, spec) in &model.addresses {
        match physical.get(address) {
            None => violations.push(InvariantViolation {
                invariant: "state_conformance",
                description: format!("declared address {} missing from physical state", address),
            }),
            Some(value) if value.datapoint_type() != spec.datapoint => {
                violations.push(InvariantViolation {
                    invariant: "state_conformance",
                    description: format!(
                        "address {} holds {} but is declared {}",
                        address,
                        value.datapoint_type(),
                        spec.datapoint
                    ),
                });
            }
            Some(_) => {}
        }
    }
    for (address, _) in physical.iter() {
        if !model.addresses.contains_key(address) {
            violations.push(InvariantViolation {
                invariant: "state_conformance",
                description: format!("physical state holds undeclared address {}", address),
            });
        }
    }

    for entry in registry.live() {
        let Some(app) = model.apps.get(&entry.name) else {
            violations.push(InvariantViolation {
                invariant: "registry_consistency",
                description: format!("live app {} has no model entry", entry.name),
            });
            continue;
        };
        for (field, spec) in &app.state_shape {
            match entry.state.get(field) {
                None => violations.push(InvariantViolation {
                    invariant: "state_conformance",
                    description: format!(
                        "app {} field {} missing from its state",
                        entry.name, field
                    ),
                }),
                Some(value) if value.datapoint_type() != spec.datapoint => {
                    violations.push(InvariantViolation {
                        invariant: "state_conformance",
                        description: format!(
                            "app {} field {} holds {} but is declared {}",
                            entry.name,
                            field,
                            value.datapoint_type(),
                            spec.datapoint
                        ),
                    });
                }
                Some(_) => {}
            }
        }
    }

    violations
}
