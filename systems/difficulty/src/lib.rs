#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session clock, discrete difficulty levels, and per-level hazard scaling.

use std::time::Duration;

use rockfall_core::{
    ensure_finite, ensure_positive,
    tuning::{DifficultyTuning, ScalingRule, ScalingTuning},
    ConfigError, ScaledParameters, ScalingBound,
};

/// Pausable session clock that derives the current difficulty level.
///
/// Time only accumulates once the clock has been started and while it is
/// running. [`DifficultyClock::fast_forward`] bypasses both flags. Level
/// increases are reported once through
/// [`DifficultyClock::observe_level_change`], however many levels were crossed.
#[derive(Clone, Debug)]
pub struct DifficultyClock {
    interval: f32,
    elapsed: Duration,
    started: bool,
    running: bool,
    observed_level: u32,
}

impl DifficultyClock {
    /// Creates a stopped clock at zero elapsed time.
    pub fn new(tuning: &DifficultyTuning) -> Result<Self, ConfigError> {
        let interval = ensure_positive("difficulty.increase_interval", tuning.increase_interval)?;
        Ok(Self {
            interval,
            elapsed: Duration::ZERO,
            started: false,
            running: true,
            observed_level: 0,
        })
    }

    /// Adds `dt` if the clock is started and running, returning the delta actually applied.
    pub fn advance(&mut self, dt: Duration) -> Duration {
        if !self.is_advancing() {
            return Duration::ZERO;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        dt
    }

    /// Adds `by` regardless of the started and running flags.
    pub fn fast_forward(&mut self, by: Duration) {
        self.elapsed = self.elapsed.saturating_add(by);
        log::debug!(target: "difficulty", "fast forward by {by:?} to {:?}", self.elapsed);
    }

    /// Starts the clock. Returns `true` only on the first call.
    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        true
    }

    /// Stops accumulating time until [`DifficultyClock::resume`] is called.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Continues accumulating time after a pause.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Returns to the initial not-started, zero-elapsed state.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.started = false;
        self.running = true;
        self.observed_level = 0;
    }

    /// Reports whether the start transition happened.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Reports whether the clock is not paused.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Reports whether a tick would currently add time.
    #[must_use]
    pub const fn is_advancing(&self) -> bool {
        self.started && self.running
    }

    /// Total session time accumulated so far.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Total session time in seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Seconds of session time per level.
    #[must_use]
    pub const fn interval(&self) -> f32 {
        self.interval
    }

    /// Difficulty level for the current elapsed time.
    #[must_use]
    pub fn current_level(&self) -> u32 {
        level_for(self.elapsed.as_secs_f64(), self.interval)
    }

    /// Returns the new level if it rose since the previous observation.
    pub fn observe_level_change(&mut self) -> Option<u32> {
        let level = self.current_level();
        if level <= self.observed_level {
            return None;
        }
        self.observed_level = level;
        Some(level)
    }
}

/// Difficulty level reached after `elapsed_secs` seconds. Negative time counts as zero.
#[must_use]
pub fn level_at(elapsed_secs: f32, interval: f32) -> u32 {
    level_for(f64::from(elapsed_secs), interval)
}

fn level_for(elapsed_secs: f64, interval: f32) -> u32 {
    if interval <= 0.0 || elapsed_secs.is_nan() || elapsed_secs <= 0.0 {
        return 0;
    }
    let steps = (elapsed_secs / f64::from(interval)).floor();
    steps.min(f64::from(u32::MAX)) as u32
}

/// Pure mapping from difficulty level to hazard parameters.
#[derive(Clone, Debug)]
pub struct ScalingPolicy {
    blink_interval: Scaler,
    rock_fall_speed: Scaler,
    wolf_move_speed: Scaler,
    spawn_delay: Scaler,
}

impl ScalingPolicy {
    /// Validates the tuning table, rejecting multipliers that move away from their bound.
    pub fn new(tuning: &ScalingTuning) -> Result<Self, ConfigError> {
        Ok(Self {
            blink_interval: Scaler::new(
                "scaling.blink_interval",
                tuning.blink_interval,
                ScalingBound::Floor,
            )?,
            rock_fall_speed: Scaler::new(
                "scaling.rock_fall_speed",
                tuning.rock_fall_speed,
                ScalingBound::Ceiling,
            )?,
            wolf_move_speed: Scaler::new(
                "scaling.wolf_move_speed",
                tuning.wolf_move_speed,
                ScalingBound::Ceiling,
            )?,
            spawn_delay: Scaler::new(
                "scaling.spawn_delay",
                tuning.spawn_delay,
                ScalingBound::Floor,
            )?,
        })
    }

    /// Hazard parameters for the provided level.
    #[must_use]
    pub fn scale_for(&self, level: u32) -> ScaledParameters {
        ScaledParameters {
            blink_interval: self.blink_interval.at(level),
            rock_fall_speed: self.rock_fall_speed.at(level),
            wolf_move_speed: self.wolf_move_speed.at(level),
            spawn_delay: self.spawn_delay.at(level),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Scaler {
    rule: ScalingRule,
    bound: ScalingBound,
}

impl Scaler {
    fn new(
        parameter: &'static str,
        rule: ScalingRule,
        bound: ScalingBound,
    ) -> Result<Self, ConfigError> {
        let _ = ensure_finite(parameter, rule.base)?;
        let _ = ensure_finite(parameter, rule.bound)?;
        let per_level = ensure_positive(parameter, rule.per_level)?;

        let inverted = match bound {
            ScalingBound::Ceiling => per_level < 1.0,
            ScalingBound::Floor => per_level > 1.0,
        };
        if inverted {
            return Err(ConfigError::InvertedScaling {
                parameter,
                per_level,
                bound,
            });
        }

        Ok(Self { rule, bound })
    }

    fn at(&self, level: u32) -> f32 {
        let exponent = i32::try_from(level).unwrap_or(i32::MAX);
        let raw = f64::from(self.rule.base) * f64::from(self.rule.per_level).powi(exponent);
        let bound = f64::from(self.rule.bound);
        let clamped = match self.bound {
            ScalingBound::Ceiling => raw.min(bound),
            ScalingBound::Floor => raw.max(bound),
        };
        clamped as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_for_rejects_degenerate_inputs() {
        assert_eq!(level_for(f64::NAN, 10.0), 0);
        assert_eq!(level_for(25.0, 0.0), 0);
        assert_eq!(level_for(f64::MAX, 1.0), u32::MAX);
    }

    #[test]
    fn unit_multiplier_is_constant() {
        let scaler = Scaler::new(
            "constant",
            ScalingRule::new(4.0, 1.0, 10.0),
            ScalingBound::Ceiling,
        )
        .expect("valid rule");
        assert_eq!(scaler.at(0), 4.0);
        assert_eq!(scaler.at(50), 4.0);
    }
}
