use std::time::Duration;

use rockfall_core::{tuning::PhaseTuning, ConfigError, Event, TimeBase};
use rockfall_system_phases::{BlendProgress, PhaseLatch, PhaseTracker};

fn tracker(danger: f32, wolves: f32, transition: f32) -> PhaseTracker {
    PhaseTracker::new(&PhaseTuning {
        danger_phase_start: danger,
        wolf_spawn_start: wolves,
        color_transition_duration: transition,
        blend_time_base: TimeBase::Presentation,
    })
    .expect("valid phase tuning")
}

#[test]
fn latch_is_inactive_below_and_active_from_threshold() {
    let mut latch = PhaseLatch::new("danger", 60.0).expect("finite threshold");
    for tenth in 0..600 {
        assert!(!latch.update(tenth as f32 / 10.0));
        assert!(!latch.is_active());
    }
    assert!(latch.update(60.0), "trip reported exactly once");
    assert!(latch.is_active());
    assert!(!latch.update(61.0));
}

#[test]
fn latch_holds_when_queried_with_an_earlier_time() {
    let mut latch = PhaseLatch::new("danger", 60.0).expect("finite threshold");
    assert!(latch.update(75.0));
    assert!(!latch.update(10.0));
    assert!(latch.is_active(), "latch must not follow time backwards");
}

#[test]
fn reset_rearms_the_latch() {
    let mut latch = PhaseLatch::new("wolves", 5.0).expect("finite threshold");
    assert!(latch.update(5.0));
    latch.reset();
    assert!(!latch.is_active());
    assert!(latch.update(6.0));
}

#[test]
fn tracker_emits_one_event_per_latch() {
    let mut tracker = tracker(60.0, 45.0, 0.5);
    let mut events = Vec::new();

    tracker.update(44.9, &mut events);
    assert!(events.is_empty());

    tracker.update(45.0, &mut events);
    assert_eq!(events, vec![Event::WolvesEnabled]);
    assert!(tracker.wolves_enabled());
    assert!(!tracker.is_danger_phase());

    events.clear();
    tracker.update(60.0, &mut events);
    tracker.update(90.0, &mut events);
    assert_eq!(events, vec![Event::DangerPhaseEntered]);
}

#[test]
fn shared_threshold_trips_both_latches_in_one_update() {
    let mut tracker = tracker(60.0, 60.0, 0.5);
    let mut events = Vec::new();
    tracker.update(70.0, &mut events);
    assert_eq!(events, vec![Event::DangerPhaseEntered, Event::WolvesEnabled]);
}

#[test]
fn blend_waits_for_the_danger_phase() {
    let mut tracker = tracker(60.0, 45.0, 0.5);
    assert_eq!(tracker.transition_progress(Duration::from_secs(3)), 0.0);
}

#[test]
fn blend_completes_one_transition_duration_after_the_trip() {
    let mut tracker = tracker(1.0, 100.0, 0.5);
    let mut events = Vec::new();
    let step = Duration::from_millis(250);

    // Trip tick: blend advances before the latch is evaluated.
    assert_eq!(tracker.transition_progress(step), 0.0);
    tracker.update(1.0, &mut events);
    assert_eq!(tracker.blend_progress(), 0.0, "no progress at trip time");

    assert_eq!(tracker.transition_progress(step), 0.5);
    assert_eq!(tracker.transition_progress(step), 1.0);
    assert_eq!(tracker.transition_progress(step), 1.0, "progress clamps at one");
}

#[test]
fn zero_duration_blend_completes_on_first_advance() {
    let mut blend = BlendProgress::new("instant", 0.0).expect("zero is allowed");
    assert_eq!(blend.progress(), 0.0);
    assert_eq!(blend.advance(Duration::ZERO), 1.0);
    assert!(blend.is_complete());
}

#[test]
fn negative_blend_duration_is_rejected() {
    let error = BlendProgress::new("phases.color_transition_duration", -1.0)
        .expect_err("negative duration is invalid");
    assert!(matches!(error, ConfigError::NonPositive { .. }));
}

#[test]
fn tracker_reset_clears_latches_and_blend() {
    let mut tracker = tracker(1.0, 1.0, 1.0);
    let mut events = Vec::new();
    tracker.update(2.0, &mut events);
    let _ = tracker.transition_progress(Duration::from_millis(500));
    tracker.reset();
    assert!(!tracker.is_danger_phase());
    assert!(!tracker.wolves_enabled());
    assert_eq!(tracker.blend_progress(), 0.0);
}
