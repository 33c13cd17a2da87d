#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rockfall survival engine.
//!
//! This crate defines the message surface that connects adapters, the
//! session orchestrator, and the pure hazard systems. Adapters submit
//! [`Command`] values describing desired mutations, the session applies them
//! and broadcasts [`Event`] values describing what happened. Systems never
//! reach into global state: everything they need from the outside world is
//! requested through the [`EntityHost`] trait handed to them per call.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod tuning;

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts the session clock if it has not been started yet.
    StartSession,
    /// Advances the simulation by the provided frame delta.
    Tick {
        /// Wall time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Stops the session clock without touching the presentation clock.
    Pause,
    /// Restarts a paused session clock.
    Resume,
    /// Adds a fixed offset to the elapsed session time, even before start.
    FastForward {
        /// Amount of session time to skip.
        by: Duration,
    },
    /// Tears down every in-flight cycle and returns to the initial state.
    ResetSession,
    /// Places a fresh target somewhere along the screen sides.
    SpawnTarget,
    /// Reports that an arrow struck a target.
    RegisterHit {
        /// Target that was struck.
        target: EntityHandle,
        /// World position of the impact.
        position: Vec2,
    },
    /// Begins the player death sequence.
    TriggerDeath {
        /// World position of the player at the moment of death.
        position: Vec2,
    },
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that both virtual clocks advanced.
    TimeAdvanced {
        /// Delta applied to the pausable session clock.
        session: Duration,
        /// Delta applied to the always-running presentation clock.
        presentation: Duration,
    },
    /// Announces that the session clock started counting.
    SessionStarted,
    /// Announces that the difficulty level increased and parameters were re-derived.
    DifficultyLevelChanged {
        /// Newly reached difficulty level.
        level: u32,
        /// Hazard parameters derived for that level.
        parameters: ScaledParameters,
    },
    /// Announces the one-shot transition into the danger phase.
    DangerPhaseEntered,
    /// Announces that every following spawn cycle includes a wolf line.
    WolvesEnabled,
    /// Confirms that warning indicators were placed for a new cycle.
    WarningsPosted {
        /// Horizontal position chosen for the falling rock.
        rock_x: f32,
        /// Wolf line announced alongside the rock, if wolves are enabled.
        wolf_line: Option<WolfLine>,
    },
    /// Confirms that a hazard entity entered the world.
    HazardSpawned {
        /// Type of hazard that was created.
        kind: HazardKind,
        /// Handle assigned by the host.
        handle: EntityHandle,
    },
    /// Reports that a hazard left the visible play area and was removed.
    HazardDespawned {
        /// Handle of the removed hazard.
        handle: EntityHandle,
    },
    /// Confirms that a target was placed.
    TargetSpawned {
        /// Handle assigned by the host.
        handle: EntityHandle,
        /// World position of the target.
        position: Vec2,
    },
    /// Confirms that a hit was scored.
    PointsAwarded {
        /// Points granted for the hit.
        points: u32,
        /// Running score after the award.
        total: u64,
        /// World position of the impact, for floating score text.
        position: Vec2,
    },
    /// Announces that the player died and the session clock froze.
    PlayerDied,
    /// Announces that the session is over.
    SessionEnded {
        /// How the session ended.
        outcome: SessionOutcome,
        /// Final score.
        score: u64,
    },
    /// Confirms that the session returned to its initial state.
    SessionReset,
}

/// How a session came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionOutcome {
    /// The player outlasted the session time limit.
    Survived,
    /// The player was killed.
    Died,
}

/// Selects which virtual clock drives a timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBase {
    /// Pausable clock that stops while paused, frozen, or not yet started.
    #[default]
    Session,
    /// Clock that keeps advancing with wall time regardless of pause or freeze.
    Presentation,
}

impl TimeBase {
    /// Picks the delta belonging to this time base.
    #[must_use]
    pub const fn select(self, session: Duration, presentation: Duration) -> Duration {
        match self {
            Self::Session => session,
            Self::Presentation => presentation,
        }
    }
}

/// Opaque identifier assigned to an entity by its host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(u32);

impl EntityHandle {
    /// Creates a handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Categories of entities the core asks its host to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Blinking indicator announcing a falling rock.
    RockWarning,
    /// Blinking indicator announcing a wolf line.
    WolfWarning,
    /// Rock falling from above the camera.
    FallingRock,
    /// Wolf running across the screen.
    Wolf,
    /// Target the player shoots at.
    Target,
}

impl EntityKind {
    /// Reports whether the entity is a hazard that moves and despawns on its own.
    #[must_use]
    pub const fn is_hazard(self) -> bool {
        matches!(self, Self::FallingRock | Self::Wolf)
    }
}

/// Collision tag applied to a spawned entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    /// Purely visual, never collides with the player.
    Cosmetic,
    /// Deals damage on contact.
    Damage,
    /// Kills the player instantly on contact.
    Lethal,
    /// Scores when struck by an arrow.
    Target,
}

/// Horizontal direction a sprite faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Sprite faces toward negative x.
    Left,
    /// Sprite faces toward positive x.
    Right,
}

/// Screen side from which a wolf line enters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Wolves enter from the left edge and run right.
    Left,
    /// Wolves enter from the right edge and run left.
    Right,
}

impl Side {
    /// Sign of the horizontal velocity for wolves entering from this side.
    #[must_use]
    pub const fn travel_sign(self) -> f32 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }

    /// Direction wolves entering from this side face while running.
    #[must_use]
    pub const fn travel_facing(self) -> Facing {
        match self {
            Self::Left => Facing::Right,
            Self::Right => Facing::Left,
        }
    }

    /// Direction that points back toward this side of the screen.
    #[must_use]
    pub const fn facing(self) -> Facing {
        match self {
            Self::Left => Facing::Left,
            Self::Right => Facing::Right,
        }
    }
}

/// Hazard families produced by the spawn cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Single rock falling straight down.
    Rock,
    /// One wolf belonging to a staggered line.
    Wolf,
}

/// Wolf line announced for the current cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WolfLine {
    /// Side the wolves enter from.
    pub side: Side,
    /// Vertical lane shared by every wolf in the line.
    pub y: f32,
}

/// Sound effects the core may trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundClip {
    /// An arrow struck a target.
    TargetHit,
    /// The player was killed.
    DeathHit,
    /// The dead player burst once the hitstop ended.
    Explosion,
}

/// Full description of an entity the host should create.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Category of the entity.
    pub kind: EntityKind,
    /// Initial world position.
    pub position: Vec2,
    /// Constant velocity in world units per second.
    pub velocity: Vec2,
    /// Direction the sprite faces.
    pub facing: Facing,
    /// Collision tag.
    pub tag: EntityTag,
    /// Draw a plain placeholder because the real sprite is unavailable.
    pub placeholder: bool,
}

/// Visible region of the orthographic camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraBounds {
    /// World position at the centre of the view.
    pub center: Vec2,
    /// Half of the visible width.
    pub half_width: f32,
    /// Half of the visible height.
    pub half_height: f32,
}

impl CameraBounds {
    /// Bounds used when no camera is available: a 16:9 view of height 20 at the origin.
    pub const FALLBACK: Self = Self {
        center: Vec2::ZERO,
        half_width: 17.78,
        half_height: 10.0,
    };

    /// World y of the top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.center.y + self.half_height
    }

    /// World y of the bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.center.y - self.half_height
    }

    /// World x of the left edge.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.center.x - self.half_width
    }

    /// World x of the right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.center.x + self.half_width
    }

    /// World x of the edge on the provided side.
    #[must_use]
    pub fn edge(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
        }
    }

    /// Reports whether the provided point lies inside the view, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.bottom()
            && point.y <= self.top()
    }
}

impl Default for CameraBounds {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Hazard parameters derived from a difficulty level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaledParameters {
    /// Seconds each warning stays visible per blink.
    pub blink_interval: f32,
    /// Downward speed of falling rocks.
    pub rock_fall_speed: f32,
    /// Horizontal speed of wolves.
    pub wolf_move_speed: f32,
    /// Seconds of cooldown between spawn cycles.
    pub spawn_delay: f32,
}

/// World-side collaborator that owns entities, the camera, and audio.
///
/// Every call is infallible from the caller's point of view: hosts degrade
/// on their own when a resource is missing and callers check
/// [`EntityHost::camera_bounds`] and [`EntityHost::has_sprite`] up front to
/// pick fallbacks.
pub trait EntityHost {
    /// Creates an entity and returns its handle.
    fn spawn_entity(&mut self, request: SpawnRequest) -> EntityHandle;

    /// Removes an entity. Unknown handles are ignored.
    fn destroy_entity(&mut self, handle: EntityHandle);

    /// Shows or hides an entity. Unknown handles are ignored.
    fn set_visible(&mut self, handle: EntityHandle, visible: bool);

    /// Reports whether the entity still exists.
    fn is_alive(&self, handle: EntityHandle) -> bool;

    /// Visible camera region, if a camera exists.
    fn camera_bounds(&self) -> Option<CameraBounds>;

    /// Reports whether a real sprite exists for the provided kind.
    fn has_sprite(&self, kind: EntityKind) -> bool;

    /// Plays a one-shot sound effect.
    fn play_sound(&mut self, clip: SoundClip, position: Vec2, volume: f32);
}

/// Converts a duration expressed in seconds, treating negative or invalid input as zero.
#[must_use]
pub fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::ZERO)
}

/// Derives an independent RNG seed for one random stream of one session generation.
///
/// Each concern draws from its own stream so that, for example, enabling wolf
/// lines never shifts the sequence of rock positions.
#[must_use]
pub fn stream_seed(seed: u64, generation: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(generation.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Reasons a tuning table is rejected at construction time.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A scaling multiplier moves the parameter away from its bound.
    #[error("{parameter} scales by {per_level} per level, which never approaches its {bound}")]
    InvertedScaling {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Configured per-level multiplier.
        per_level: f32,
        /// Direction of the configured bound.
        bound: ScalingBound,
    },
    /// A value is NaN or infinite.
    #[error("{parameter} must be finite, found {value}")]
    NonFinite {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Value supplied.
        value: f32,
    },
    /// A value that must be strictly positive is not.
    #[error("{parameter} must be positive, found {value}")]
    NonPositive {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Value supplied.
        value: f32,
    },
    /// A range has its minimum above its maximum.
    #[error("{parameter} range is empty: min {min} exceeds max {max}")]
    EmptyRange {
        /// Name of the offending range.
        parameter: &'static str,
        /// Configured minimum.
        min: f32,
        /// Configured maximum.
        max: f32,
    },
    /// A count that must be at least one is zero.
    #[error("{parameter} must be at least one")]
    ZeroCount {
        /// Name of the offending parameter.
        parameter: &'static str,
    },
}

/// Direction in which a scaled parameter saturates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalingBound {
    /// Parameter grows toward a maximum.
    Ceiling,
    /// Parameter shrinks toward a minimum.
    Floor,
}

impl std::fmt::Display for ScalingBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ceiling => f.write_str("ceiling"),
            Self::Floor => f.write_str("floor"),
        }
    }
}

/// Rejects NaN and infinite values.
pub fn ensure_finite(parameter: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { parameter, value })
    }
}

/// Rejects values that are not strictly positive and finite.
pub fn ensure_positive(parameter: &'static str, value: f32) -> Result<f32, ConfigError> {
    let value = ensure_finite(parameter, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { parameter, value })
    }
}

#[cfg(test)]
mod tests {
    use super::{seconds, stream_seed, CameraBounds, ConfigError, ScalingBound, Side};
    use crate::tuning::GameTuning;
    use glam::Vec2;
    use std::time::Duration;

    #[test]
    fn camera_edges_follow_center() {
        let camera = CameraBounds {
            center: Vec2::new(2.0, -1.0),
            half_width: 4.0,
            half_height: 3.0,
        };
        assert_eq!(camera.left(), -2.0);
        assert_eq!(camera.right(), 6.0);
        assert_eq!(camera.top(), 2.0);
        assert_eq!(camera.bottom(), -4.0);
        assert_eq!(camera.edge(Side::Right), 6.0);
        assert!(camera.contains(Vec2::new(6.0, 2.0)));
        assert!(!camera.contains(Vec2::new(6.1, 0.0)));
    }

    #[test]
    fn wolves_face_away_from_their_entry_side() {
        assert_eq!(Side::Left.travel_sign(), 1.0);
        assert_eq!(Side::Right.travel_sign(), -1.0);
        assert_ne!(Side::Left.facing(), Side::Left.travel_facing());
    }

    #[test]
    fn negative_and_nan_seconds_become_zero() {
        assert_eq!(seconds(-3.0), Duration::ZERO);
        assert_eq!(seconds(f32::NAN), Duration::ZERO);
        assert_eq!(seconds(0.5), Duration::from_millis(500));
    }

    #[test]
    fn stream_seeds_separate_labels_and_generations() {
        let rock = stream_seed(7, 0, "rock");
        assert_eq!(rock, stream_seed(7, 0, "rock"));
        assert_ne!(rock, stream_seed(7, 0, "wolf"));
        assert_ne!(rock, stream_seed(7, 1, "rock"));
    }

    #[test]
    fn config_errors_render_parameter_names() {
        let error = ConfigError::InvertedScaling {
            parameter: "rock_fall_speed",
            per_level: 0.8,
            bound: ScalingBound::Ceiling,
        };
        let message = error.to_string();
        assert!(message.contains("rock_fall_speed"), "{message}");
        assert!(message.contains("ceiling"), "{message}");
    }

    #[test]
    fn game_tuning_round_trips_through_bincode() {
        let tuning = GameTuning::default();
        let bytes = bincode::serialize(&tuning).expect("serialize");
        let restored: GameTuning = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, tuning);
    }
}
