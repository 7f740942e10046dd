//! Shared model fixtures for unit tests.
//!
//! One small two-datapoint installation: a presence sensor on 0/0/1 and a
//! hall switch on 0/0/2, plus a `lights` app whose invariant ties the
//! switch to the sensor (or its own INT_0 counter reaching 42).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::vec;

use crate::expr::{CmpOp, Expr};
use crate::model::{
    Action, AddressSpec, AppModel, DeviceClass, DeviceWrapper, FieldSpec, Iteration, MethodBody,
    MethodSpec, Rule, VerificationModel,
};
use crate::types::{DatapointType, GroupAddress, Value};

pub(crate) fn ga(sub: u8) -> GroupAddress {
    GroupAddress::new(0, 0, sub).unwrap()
}

pub(crate) fn binary_sensor_class() -> DeviceClass {
    let mut methods = BTreeMap::new();
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
        name: "binary_sensor".to_string(),
        methods,
    }
}

pub(crate) fn switch_class() -> DeviceClass {
    let mut methods = BTreeMap::new();
    methods.insert(
        "on".to_string(),
        MethodSpec {
            pre: None,
            post: Some(Expr::Slot("state".to_string())),
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
            post: Some(Expr::Not(Box::new(Expr::Slot("state".to_string())))),
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

fn bind(class: &DeviceClass, address: GroupAddress) -> DeviceWrapper {
    let mut bindings = BTreeMap::new();
    bindings.insert("state".to_string(), address);
    DeviceWrapper::bind(class, bindings).unwrap()
}

/// `presence.is_on() or INT_0 == 42`
pub(crate) fn trigger_condition() -> Expr {
    Expr::Any(vec![
        Expr::Read {
            instance: "presence".to_string(),
            method: "is_on".to_string(),
        },
        Expr::Cmp {
            op: CmpOp::Eq,
            lhs: Box::new(Expr::Field("INT_0".to_string())),
            rhs: Box::new(Expr::Lit(Value::Int(42))),
        },
    ])
}

/// The `lights` app: hall switch must mirror the trigger condition.
pub(crate) fn lights_app() -> AppModel {
    let mut state_shape = BTreeMap::new();
    state_shape.insert("INT_0".to_string(), FieldSpec::defaulted(DatapointType::Int));

    let mut devices = BTreeMap::new();
    devices.insert("presence".to_string(), bind(&binary_sensor_class(), ga(1)));
    devices.insert("hall_switch".to_string(), bind(&switch_class(), ga(2)));

    let invariant = Expr::Cmp {
        op: CmpOp::Eq,
        lhs: Box::new(trigger_condition()),
        rhs: Box::new(Expr::Read {
            instance: "hall_switch".to_string(),
            method: "is_on".to_string(),
        }),
    };

    let iteration = Iteration {
        rules: vec![Rule {
            when: trigger_condition(),
            then: vec![Action::Invoke {
                instance: "hall_switch".to_string(),
                method: "on".to_string(),
            }],
            otherwise: vec![Action::Invoke {
                instance: "hall_switch".to_string(),
                method: "off".to_string(),
            }],
        }],
    };

    AppModel {
        state_shape,
        devices,
        invariant,
        iteration,
    }
}

/// Model with the single `lights` app.
pub(crate) fn example_model() -> VerificationModel {
    let mut addresses = BTreeMap::new();
    addresses.insert(ga(1), AddressSpec::defaulted(DatapointType::Bool));
    addresses.insert(ga(2), AddressSpec::defaulted(DatapointType::Bool));

    let mut apps = BTreeMap::new();
    apps.insert("lights".to_string(), lights_app());

    VerificationModel { addresses, apps }
}

/// Model with a second app, `night_guard`, whose invariant forbids the
/// hall switch ever being on: any write turning 0/0/2 on violates the
/// merged invariant through the *other* app's clause.
pub(crate) fn conflicting_model() -> VerificationModel {
    let mut model = example_model();
    model.apps.insert(
        "night_guard".to_string(),
        AppModel {
            state_shape: BTreeMap::new(),
            devices: BTreeMap::new(),
            invariant: Expr::Not(Box::new(Expr::Address(ga(2)))),
            iteration: Iteration { rules: vec![] },
        },
    );
    model
}
