use blight_core::{CorruptionLevel, Event};
use blight_system_escalation::LevelController;

#[test]
fn baseline_escalates_up_to_the_cap() {
    let mut controller = LevelController::default();
    let mut events = Vec::new();

    let mut previous = controller.level();
    for _ in 0..10 {
        let _ = controller.escalate(&mut events);
        assert!(controller.level() >= previous);
        previous = controller.level();
    }

    assert_eq!(controller.level(), CorruptionLevel::MAX);
    assert_eq!(events.len(), 4);
    assert!(!controller.escalate(&mut events));
}

#[test]
fn surge_expiry_restores_the_pre_surge_level() {
    let mut controller = LevelController::default();
    let mut events = Vec::new();
    let _ = controller.escalate(&mut events);
    let before = controller.level();

    let surge = controller.begin_surge(&mut events);
    assert_eq!(controller.level(), before.raised_by(1));
    assert!(controller.end_surge(surge, &mut events));
    assert_eq!(controller.level(), before);
    assert!(!controller.end_surge(surge, &mut events));
}

#[test]
fn overlapping_surges_never_alter_the_baseline() {
    let mut controller = LevelController::default();
    let mut events = Vec::new();

    let first = controller.begin_surge(&mut events);
    let second = controller.begin_surge(&mut events);
    assert_eq!(controller.level().get(), 3);
    assert_eq!(controller.baseline(), CorruptionLevel::MIN);

    assert!(controller.end_surge(first, &mut events));
    assert_eq!(controller.level().get(), 2);
    assert!(controller.end_surge(second, &mut events));
    assert_eq!(controller.level(), CorruptionLevel::MIN);
    assert_eq!(controller.active_surges(), 0);
}

#[test]
fn expiry_lands_on_a_baseline_that_escalated_meanwhile() {
    let mut controller = LevelController::default();
    let mut events = Vec::new();

    let surge = controller.begin_surge(&mut events);
    let _ = controller.escalate(&mut events);
    assert_eq!(controller.level().get(), 3);

    assert!(controller.end_surge(surge, &mut events));
    assert_eq!(controller.level().get(), 2);
    assert_eq!(
        events.last(),
        Some(&Event::SurgeExpired {
            level: CorruptionLevel::new(2)
        })
    );
}

#[test]
fn surges_respect_the_cap() {
    let mut controller = LevelController::default();
    let mut events = Vec::new();
    for _ in 0..4 {
        let _ = controller.escalate(&mut events);
    }

    let surge = controller.begin_surge(&mut events);
    assert_eq!(controller.level(), CorruptionLevel::MAX);
    assert!(controller.end_surge(surge, &mut events));
    assert_eq!(controller.level(), CorruptionLevel::MAX);
}

#[test]
fn reset_returns_to_the_minimum() {
    let mut controller = LevelController::default();
    let mut events = Vec::new();
    let _ = controller.escalate(&mut events);
    let _ = controller.begin_surge(&mut events);

    controller.reset();

    assert_eq!(controller.level(), CorruptionLevel::MIN);
    assert_eq!(controller.active_surges(), 0);
}
