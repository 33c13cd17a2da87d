//! Serializable tuning tables for every adjustable aspect of a session.
//!
//! Each section carries the defaults a session plays with out of the box. Systems
//! validate the section they consume when they are constructed, so a table
//! loaded from disk is only trusted after it has passed through a system
//! constructor.

use serde::{Deserialize, Serialize};

use crate::{CameraBounds, TimeBase};

/// Aggregated tuning for a whole session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    /// Difficulty clock cadence.
    pub difficulty: DifficultyTuning,
    /// Per-level hazard parameter growth.
    pub scaling: ScalingTuning,
    /// Danger phase and wolf thresholds.
    pub phases: PhaseTuning,
    /// Hazard spawn cycle geometry and cadence.
    pub spawning: SpawnTuning,
    /// Point value schedule.
    pub scoring: ScoreTuning,
    /// Target respawn placement.
    pub targets: TargetTuning,
    /// Session lifecycle.
    pub session: SessionTuning,
    /// Camera used by the headless stage.
    pub camera: CameraBounds,
}

/// Difficulty clock cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    /// Seconds of session time per difficulty level.
    pub increase_interval: f32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            increase_interval: 10.0,
        }
    }
}

/// Geometric growth of a single parameter toward its bound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalingRule {
    /// Value at level zero.
    pub base: f32,
    /// Multiplier applied once per level.
    pub per_level: f32,
    /// Value the parameter saturates at.
    pub bound: f32,
}

impl ScalingRule {
    /// Creates a rule from its base, per-level multiplier, and bound.
    #[must_use]
    pub const fn new(base: f32, per_level: f32, bound: f32) -> Self {
        Self {
            base,
            per_level,
            bound,
        }
    }
}

/// Per-level growth for every scaled hazard parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingTuning {
    /// Warning blink interval, shrinking toward a floor.
    pub blink_interval: ScalingRule,
    /// Rock fall speed, growing toward a ceiling.
    pub rock_fall_speed: ScalingRule,
    /// Wolf run speed, growing toward a ceiling.
    pub wolf_move_speed: ScalingRule,
    /// Cooldown between cycles, shrinking toward a floor.
    pub spawn_delay: ScalingRule,
}

impl Default for ScalingTuning {
    fn default() -> Self {
        Self {
            blink_interval: ScalingRule::new(0.4, 0.9, 0.15),
            rock_fall_speed: ScalingRule::new(10.0, 1.15, 30.0),
            wolf_move_speed: ScalingRule::new(15.0, 1.1, 35.0),
            spawn_delay: ScalingRule::new(2.0, 0.9, 0.5),
        }
    }
}

/// Thresholds for the one-way phase latches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTuning {
    /// Elapsed seconds at which the danger phase begins.
    pub danger_phase_start: f32,
    /// Elapsed seconds at which wolf lines join the spawn cycle.
    pub wolf_spawn_start: f32,
    /// Seconds the danger tint takes to blend in fully.
    pub color_transition_duration: f32,
    /// Clock driving the danger tint blend.
    pub blend_time_base: TimeBase,
}

impl Default for PhaseTuning {
    fn default() -> Self {
        Self {
            danger_phase_start: 60.0,
            wolf_spawn_start: 45.0,
            color_transition_duration: 0.5,
            blend_time_base: TimeBase::Presentation,
        }
    }
}

/// Inclusive range sampled uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpanTuning {
    /// Lowest value that may be drawn.
    pub min: f32,
    /// Highest value that may be drawn.
    pub max: f32,
}

impl SpanTuning {
    /// Creates a span covering `min..=max`.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// Hazard spawn cycle geometry and cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Horizontal range for rock drops.
    pub rock_spawn_x: SpanTuning,
    /// Distance above the camera top at which rocks appear.
    pub rock_spawn_height_offset: f32,
    /// Vertical range for wolf lanes.
    pub wolf_spawn_y: SpanTuning,
    /// Distance beyond the screen edge at which the lead wolf appears.
    pub wolf_edge_offset: f32,
    /// Distance inside the screen edge at which the wolf warning is drawn.
    pub wolf_warning_inset: f32,
    /// Number of show phases before the hazard appears.
    pub blinks_before_drop: u32,
    /// Number of wolves in each line.
    pub wolves_per_line: u32,
    /// Gap between consecutive wolves in a line.
    pub wolf_spacing: f32,
    /// Seed for hazard placement.
    pub rng_seed: u64,
    /// Clock driving blink and cooldown waits.
    ///
    /// Either base stops during the death sequence and once the session has
    /// ended; the presentation base only keeps the cycle running through a pause.
    pub time_base: TimeBase,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            rock_spawn_x: SpanTuning::new(-13.0, 17.0),
            rock_spawn_height_offset: 2.0,
            wolf_spawn_y: SpanTuning::new(-6.0, -1.0),
            wolf_edge_offset: 2.0,
            wolf_warning_inset: 1.0,
            blinks_before_drop: 3,
            wolves_per_line: 3,
            wolf_spacing: 1.5,
            rng_seed: 0x5eed_0f0c_4e11,
            time_base: TimeBase::Session,
        }
    }
}

/// Point value schedule. The danger phase start is shared with [`PhaseTuning`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    /// Points for a hit at time zero.
    pub base_points: u32,
    /// Points added per interval before the danger phase.
    pub normal_increment: u32,
    /// Points added per interval after the danger phase starts.
    pub danger_increment: u32,
    /// Seconds per point increase.
    pub point_increase_interval: f32,
    /// Volume of the target hit sound.
    pub hit_volume: f32,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            base_points: 100,
            normal_increment: 50,
            danger_increment: 75,
            point_increase_interval: 15.0,
            hit_volume: 0.8,
        }
    }
}

/// Where targets reappear after being hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetTuning {
    /// x used when the target reappears on the left.
    pub left_x: f32,
    /// x used when the target reappears on the right.
    pub right_x: f32,
    /// Vertical range for target placement.
    pub spawn_y: SpanTuning,
    /// Seed for target placement.
    pub rng_seed: u64,
}

impl Default for TargetTuning {
    fn default() -> Self {
        Self {
            left_x: -22.0,
            right_x: 22.0,
            spawn_y: SpanTuning::new(-7.0, 9.0),
            rng_seed: 0x7a26_e7,
        }
    }
}

/// Session lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Seconds the player must survive. Non-positive disables the limit.
    pub time_limit: f32,
    /// Seconds the world stays frozen after the player dies.
    pub hitstop_duration: f32,
    /// Seconds between the end of the hitstop and the end of the session.
    pub death_screen_delay: f32,
    /// Volume of the death sound.
    pub death_volume: f32,
    /// Volume of the explosion played when the hitstop ends.
    pub explosion_volume: f32,
}

impl SessionTuning {
    /// Time limit in seconds, if one is configured.
    #[must_use]
    pub fn limit(&self) -> Option<f32> {
        (self.time_limit > 0.0).then_some(self.time_limit)
    }
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            time_limit: 120.0,
            hitstop_duration: 1.0,
            death_screen_delay: 2.0,
            death_volume: 1.0,
            explosion_volume: 0.8,
        }
    }
}
