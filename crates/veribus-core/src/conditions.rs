//! Merged invariant evaluation
//!
//! The condition checker is the conjunction of every currently-live app's
//! invariant, each given the full physical state, its own private state
//! and the ambient wall clock. Pure and side-effect-free; total over
//! models that passed validation.

use crate::expr::{eval_bool, EvalCtx, EvalError};
use crate::model::VerificationModel;
use crate::registry::AppRegistry;
use crate::state::PhysicalState;
use crate::types::WallClock;

/// Evaluate the merged invariant.
///
/// Returns `Ok(false)` as soon as one live app's invariant fails. An
/// `Err` means a live app has no model entry or an expression failed to
/// evaluate - a configuration defect, not an app fault.
pub fn check_conditions(
    model: &VerificationModel,
    registry: &AppRegistry,
    physical: &PhysicalState,
    clock: &WallClock,
) -> Result<bool, EvalError> {
    for entry in registry.live() {
        let app = model
            .apps
            .get(&entry.name)
            .ok_or_else(|| EvalError::UnknownApp(entry.name.clone()))?;
        let ctx = EvalCtx {
            physical,
            app_state: Some(&entry.state),
            devices: &app.devices,
            clock,
            result: None,
        };
        if !eval_bool(&app.invariant, &ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::string::ToString;

    use crate::fixtures::{conflicting_model, example_model, ga};
    use crate::types::Value;

    fn setup(
        model: &VerificationModel,
    ) -> (AppRegistry, PhysicalState, WallClock) {
        (
            AppRegistry::from_model(model, &BTreeMap::new()),
            model.physical_state(),
            WallClock::epoch(),
        )
    }

    #[test]
    fn test_holds_on_default_state() {
        let model = example_model();
        let (registry, physical, clock) = setup(&model);
        assert_eq!(
            check_conditions(&model, &registry, &physical, &clock),
            Ok(true)
        );
    }

    #[test]
    fn test_fails_when_one_invariant_breaks() {
        let model = example_model();
        let (registry, mut physical, clock) = setup(&model);

        // Sensor on but switch still off: lights invariant is violated.
        physical.set(ga(1), Value::Bool(true)).unwrap();
        assert_eq!(
            check_conditions(&model, &registry, &physical, &clock),
            Ok(false)
        );

        // Switch catches up: holds again.
        physical.set(ga(2), Value::Bool(true)).unwrap();
        assert_eq!(
            check_conditions(&model, &registry, &physical, &clock),
            Ok(true)
        );
    }

    #[test]
    fn test_private_state_feeds_invariant() {
        let model = example_model();
        let (mut registry, physical, clock) = setup(&model);

        // INT_0 == 42 triggers the condition while the switch is off.
        registry
            .get_mut("lights")
            .unwrap()
            .state
            .set("INT_0", Value::Int(42))
            .unwrap();
        assert_eq!(
            check_conditions(&model, &registry, &physical, &clock),
            Ok(false)
        );
    }

    #[test]
    fn test_conjunction_over_all_live_apps() {
        let model = conflicting_model();
        let (registry, mut physical, clock) = setup(&model);

        // Satisfies the lights invariant but breaks night_guard's.
        physical.set(ga(1), Value::Bool(true)).unwrap();
        physical.set(ga(2), Value::Bool(true)).unwrap();
        assert_eq!(
            check_conditions(&model, &registry, &physical, &clock),
            Ok(false)
        );
    }

    #[test]
    fn test_killed_apps_leave_the_conjunction() {
        let model = conflicting_model();
        let (mut registry, mut physical, clock) = setup(&model);

        physical.set(ga(1), Value::Bool(true)).unwrap();
        physical.set(ga(2), Value::Bool(true)).unwrap();
        registry.kill("night_guard");
        assert_eq!(
            check_conditions(&model, &registry, &physical, &clock),
            Ok(true)
        );
    }

    #[test]
    fn test_live_app_without_model_entry_is_a_defect() {
        let model = example_model();
        let (mut registry, physical, clock) = setup(&model);
        registry.register("ghost", crate::state::AppState::released(), None);
        assert_eq!(
            check_conditions(&model, &registry, &physical, &clock),
            Err(EvalError::UnknownApp("ghost".to_string()))
        );
    }

    #[test]
    fn test_empty_registry_holds_vacuously() {
        let model = example_model();
        let registry = AppRegistry::new();
        let physical = model.physical_state();
        assert_eq!(
            check_conditions(&model, &registry, &physical, &WallClock::epoch()),
            Ok(true)
        );
    }
}
