#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! One-way phase latches for the danger phase and wolf enablement.

use std::time::Duration;

use rockfall_core::{ensure_finite, tuning::PhaseTuning, ConfigError, Event, TimeBase};

/// Boolean that flips to `true` once elapsed time reaches a threshold and never reverts.
#[derive(Clone, Copy, Debug)]
pub struct PhaseLatch {
    threshold: f32,
    active: bool,
}

impl PhaseLatch {
    /// Creates an inactive latch tripping at `threshold` seconds.
    pub fn new(parameter: &'static str, threshold: f32) -> Result<Self, ConfigError> {
        Ok(Self {
            threshold: ensure_finite(parameter, threshold)?,
            active: false,
        })
    }

    /// Trips the latch if `elapsed_secs` reached the threshold. Returns `true` only on the trip.
    pub fn update(&mut self, elapsed_secs: f32) -> bool {
        if self.active || elapsed_secs.is_nan() || elapsed_secs < self.threshold {
            return false;
        }
        self.active = true;
        true
    }

    /// Reports whether the latch has tripped.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Seconds at which the latch trips.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Re-arms the latch for a new session.
    pub fn reset(&mut self) {
        self.active = false;
    }
}

/// Linear 0..=1 progress used to blend presentation colours.
#[derive(Clone, Copy, Debug)]
pub struct BlendProgress {
    duration: f32,
    progress: f32,
}

impl BlendProgress {
    /// Creates a blend that completes after `duration` seconds of advancement.
    pub fn new(parameter: &'static str, duration: f32) -> Result<Self, ConfigError> {
        let duration = ensure_finite(parameter, duration)?;
        if duration < 0.0 {
            return Err(ConfigError::NonPositive {
                parameter,
                value: duration,
            });
        }
        Ok(Self {
            duration,
            progress: 0.0,
        })
    }

    /// Moves the blend forward by `dt` and returns the new progress.
    pub fn advance(&mut self, dt: Duration) -> f32 {
        if self.duration <= 0.0 {
            self.progress = 1.0;
        } else {
            self.progress = (self.progress + dt.as_secs_f32() / self.duration).clamp(0.0, 1.0);
        }
        self.progress
    }

    /// Current progress in `0.0..=1.0`.
    #[must_use]
    pub const fn progress(&self) -> f32 {
        self.progress
    }

    /// Reports whether the blend reached its end.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Returns the blend to zero.
    pub fn reset(&mut self) {
        self.progress = 0.0;
    }
}

/// Tracks the danger phase, its colour blend, and wolf enablement.
#[derive(Clone, Debug)]
pub struct PhaseTracker {
    danger: PhaseLatch,
    wolves: PhaseLatch,
    blend: BlendProgress,
    blend_time_base: TimeBase,
}

impl PhaseTracker {
    /// Validates thresholds and creates a tracker with both latches disarmed.
    pub fn new(tuning: &PhaseTuning) -> Result<Self, ConfigError> {
        Ok(Self {
            danger: PhaseLatch::new("phases.danger_phase_start", tuning.danger_phase_start)?,
            wolves: PhaseLatch::new("phases.wolf_spawn_start", tuning.wolf_spawn_start)?,
            blend: BlendProgress::new(
                "phases.color_transition_duration",
                tuning.color_transition_duration,
            )?,
            blend_time_base: tuning.blend_time_base,
        })
    }

    /// Feeds the current elapsed time, emitting one event per latch that trips.
    pub fn update(&mut self, elapsed_secs: f32, out: &mut Vec<Event>) {
        if self.danger.update(elapsed_secs) {
            log::info!(target: "phases", "danger phase entered at {elapsed_secs:.2}s");
            out.push(Event::DangerPhaseEntered);
        }
        if self.wolves.update(elapsed_secs) {
            log::info!(target: "phases", "wolves enabled at {elapsed_secs:.2}s");
            out.push(Event::WolvesEnabled);
        }
    }

    /// Advances the danger colour blend. Does nothing before the danger phase.
    ///
    /// Call this before [`PhaseTracker::update`] within a tick so the trip
    /// tick itself contributes no progress and the blend completes exactly
    /// one transition duration after the trip.
    pub fn transition_progress(&mut self, dt: Duration) -> f32 {
        if self.danger.is_active() {
            let _ = self.blend.advance(dt);
        }
        self.blend.progress()
    }

    /// Reports whether the danger phase is active.
    #[must_use]
    pub const fn is_danger_phase(&self) -> bool {
        self.danger.is_active()
    }

    /// Reports whether wolf lines join the spawn cycle.
    #[must_use]
    pub const fn wolves_enabled(&self) -> bool {
        self.wolves.is_active()
    }

    /// Danger colour blend progress in `0.0..=1.0`.
    #[must_use]
    pub const fn blend_progress(&self) -> f32 {
        self.blend.progress()
    }

    /// Clock selected to drive the colour blend.
    #[must_use]
    pub const fn blend_time_base(&self) -> TimeBase {
        self.blend_time_base
    }

    /// Elapsed seconds at which the danger phase begins.
    #[must_use]
    pub const fn danger_phase_start(&self) -> f32 {
        self.danger.threshold()
    }

    /// Re-arms both latches and clears the blend for a new session.
    pub fn reset(&mut self) {
        self.danger.reset();
        self.wolves.reset();
        self.blend.reset();
    }
}
