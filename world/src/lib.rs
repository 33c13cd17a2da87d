#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative entity table for a Rockfall session.
//!
//! The [`Stage`] owns every entity the session asks for through
//! [`EntityHost`], integrates hazard motion, and removes hazards once they
//! leave the play area. Adapters inspect it through the [`query`] module.

use std::{collections::BTreeSet, time::Duration};

use glam::Vec2;
use rockfall_core::{
    CameraBounds, EntityHandle, EntityHost, EntityKind, EntityTag, Event, Facing, SoundClip,
    SpawnRequest,
};

const ROCK_DESPAWN_MARGIN: f32 = 2.0;
const WOLF_DESPAWN_MARGIN: f32 = 5.0;

#[derive(Clone, Copy, Debug)]
struct Entity {
    handle: EntityHandle,
    kind: EntityKind,
    position: Vec2,
    velocity: Vec2,
    facing: Facing,
    tag: EntityTag,
    placeholder: bool,
    visible: bool,
}

impl Entity {
    fn spawned(handle: EntityHandle, request: SpawnRequest) -> Self {
        Self {
            handle,
            kind: request.kind,
            position: request.position,
            velocity: request.velocity,
            facing: request.facing,
            tag: request.tag,
            placeholder: request.placeholder,
            visible: true,
        }
    }

    fn has_left(&self, camera: &CameraBounds) -> bool {
        if !self.kind.is_hazard() {
            return false;
        }
        if self.kind == EntityKind::FallingRock {
            self.position.y < camera.bottom() - ROCK_DESPAWN_MARGIN
        } else if self.velocity.x >= 0.0 {
            self.position.x > camera.right() + WOLF_DESPAWN_MARGIN
        } else {
            self.position.x < camera.left() - WOLF_DESPAWN_MARGIN
        }
    }
}

/// Sound effect the stage was asked to play.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayedSound {
    /// Clip that was requested.
    pub clip: SoundClip,
    /// World position of the emitter.
    pub position: Vec2,
    /// Requested volume.
    pub volume: f32,
}

/// Headless play area implementing [`EntityHost`].
#[derive(Debug)]
pub struct Stage {
    camera: Option<CameraBounds>,
    missing_sprites: BTreeSet<EntityKind>,
    entities: Vec<Entity>,
    next_handle: u32,
    sounds: Vec<PlayedSound>,
}

impl Stage {
    /// Creates an empty stage viewed through `camera`.
    #[must_use]
    pub fn new(camera: CameraBounds) -> Self {
        Self {
            camera: Some(camera),
            missing_sprites: BTreeSet::new(),
            entities: Vec::new(),
            next_handle: 0,
            sounds: Vec::new(),
        }
    }

    /// Creates a stage that reports no camera, forcing callers onto their fallback bounds.
    #[must_use]
    pub fn without_camera() -> Self {
        Self {
            camera: None,
            ..Self::new(CameraBounds::FALLBACK)
        }
    }

    /// Marks the sprite for `kind` as unavailable.
    #[must_use]
    pub fn with_missing_sprite(mut self, kind: EntityKind) -> Self {
        let _ = self.missing_sprites.insert(kind);
        self
    }

    /// Takes every sound played since the last drain, oldest first.
    pub fn drain_sounds(&mut self) -> Vec<PlayedSound> {
        std::mem::take(&mut self.sounds)
    }

    fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .find(|entity| entity.handle == handle)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(CameraBounds::FALLBACK)
    }
}

impl EntityHost for Stage {
    fn spawn_entity(&mut self, request: SpawnRequest) -> EntityHandle {
        let handle = EntityHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.entities.push(Entity::spawned(handle, request));
        handle
    }

    fn destroy_entity(&mut self, handle: EntityHandle) {
        self.entities.retain(|entity| entity.handle != handle);
    }

    fn set_visible(&mut self, handle: EntityHandle, visible: bool) {
        if let Some(entity) = self.entity_mut(handle) {
            entity.visible = visible;
        }
    }

    fn is_alive(&self, handle: EntityHandle) -> bool {
        self.entities.iter().any(|entity| entity.handle == handle)
    }

    fn camera_bounds(&self) -> Option<CameraBounds> {
        self.camera
    }

    fn has_sprite(&self, kind: EntityKind) -> bool {
        !self.missing_sprites.contains(&kind)
    }

    fn play_sound(&mut self, clip: SoundClip, position: Vec2, volume: f32) {
        self.sounds.push(PlayedSound {
            clip,
            position,
            volume,
        });
    }
}

/// Moves every entity by its velocity and removes hazards that left the play area.
///
/// `dt` is session time, so hazards hold still while the session is paused
/// or frozen.
pub fn advance(stage: &mut Stage, dt: Duration, out_events: &mut Vec<Event>) {
    if dt.is_zero() {
        return;
    }
    let seconds = dt.as_secs_f32();
    for entity in stage.entities.iter_mut() {
        entity.position += entity.velocity * seconds;
    }

    let camera = stage.camera.unwrap_or(CameraBounds::FALLBACK);
    stage.entities.retain(|entity| {
        if entity.has_left(&camera) {
            log::trace!(target: "stage", "{:?} {} left the play area", entity.kind, entity.handle.get());
            out_events.push(Event::HazardDespawned {
                handle: entity.handle,
            });
            false
        } else {
            true
        }
    });
}

/// Read-only accessors over the stage.
pub mod query {
    use glam::Vec2;
    use rockfall_core::{EntityHandle, EntityKind, EntityTag, Facing};

    use super::{PlayedSound, Stage};

    /// Immutable view of a single entity.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct EntitySnapshot {
        /// Handle of the entity.
        pub handle: EntityHandle,
        /// Category of the entity.
        pub kind: EntityKind,
        /// Current world position.
        pub position: Vec2,
        /// Constant velocity.
        pub velocity: Vec2,
        /// Sprite facing.
        pub facing: Facing,
        /// Collision tag.
        pub tag: EntityTag,
        /// Whether a placeholder is drawn instead of the sprite.
        pub placeholder: bool,
        /// Whether the entity is currently shown.
        pub visible: bool,
    }

    /// Captures every live entity ordered by handle.
    #[must_use]
    pub fn entities(stage: &Stage) -> Vec<EntitySnapshot> {
        let mut snapshots: Vec<EntitySnapshot> = stage
            .entities
            .iter()
            .map(|entity| EntitySnapshot {
                handle: entity.handle,
                kind: entity.kind,
                position: entity.position,
                velocity: entity.velocity,
                facing: entity.facing,
                tag: entity.tag,
                placeholder: entity.placeholder,
                visible: entity.visible,
            })
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.handle);
        snapshots
    }

    /// Retrieves a single entity.
    #[must_use]
    pub fn entity(stage: &Stage, handle: EntityHandle) -> Option<EntitySnapshot> {
        entities(stage)
            .into_iter()
            .find(|snapshot| snapshot.handle == handle)
    }

    /// Counts live entities of the provided kind.
    #[must_use]
    pub fn count(stage: &Stage, kind: EntityKind) -> usize {
        stage
            .entities
            .iter()
            .filter(|entity| entity.kind == kind)
            .count()
    }

    /// Total number of live entities.
    #[must_use]
    pub fn population(stage: &Stage) -> usize {
        stage.entities.len()
    }

    /// Sounds played since the last [`Stage::drain_sounds`], oldest first.
    #[must_use]
    pub fn sounds(stage: &Stage) -> &[PlayedSound] {
        &stage.sounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: EntityKind, position: Vec2, velocity: Vec2) -> SpawnRequest {
        SpawnRequest {
            kind,
            position,
            velocity,
            facing: Facing::Right,
            tag: EntityTag::Cosmetic,
            placeholder: false,
        }
    }

    #[test]
    fn handles_are_unique_and_destroy_is_idempotent() {
        let mut stage = Stage::default();
        let first = stage.spawn_entity(request(EntityKind::Target, Vec2::ZERO, Vec2::ZERO));
        let second = stage.spawn_entity(request(EntityKind::Target, Vec2::ZERO, Vec2::ZERO));
        assert_ne!(first, second);

        stage.destroy_entity(first);
        stage.destroy_entity(first);
        assert!(!stage.is_alive(first));
        assert!(stage.is_alive(second));
    }

    #[test]
    fn rocks_despawn_below_the_margin() {
        let mut stage = Stage::default();
        let rock = stage.spawn_entity(request(
            EntityKind::FallingRock,
            Vec2::new(0.0, -11.0),
            Vec2::new(0.0, -1.0),
        ));
        let mut events = Vec::new();

        advance(&mut stage, Duration::from_millis(500), &mut events);
        assert!(stage.is_alive(rock), "still within the margin");

        advance(&mut stage, Duration::from_secs(1), &mut events);
        assert!(!stage.is_alive(rock));
        assert_eq!(events, vec![Event::HazardDespawned { handle: rock }]);
    }

    #[test]
    fn wolves_despawn_past_the_far_edge_only() {
        let mut stage = Stage::default();
        let right_runner = stage.spawn_entity(request(
            EntityKind::Wolf,
            Vec2::new(-20.0, 0.0),
            Vec2::new(10.0, 0.0),
        ));
        let mut events = Vec::new();

        advance(&mut stage, Duration::from_secs(4), &mut events);
        assert!(stage.is_alive(right_runner), "entry side never despawns");

        advance(&mut stage, Duration::from_millis(500), &mut events);
        assert!(!stage.is_alive(right_runner));
    }

    #[test]
    fn moving_warnings_and_targets_never_despawn() {
        let mut stage = Stage::default();
        let warning = stage.spawn_entity(request(
            EntityKind::RockWarning,
            Vec2::new(0.0, -11.0),
            Vec2::new(0.0, -10.0),
        ));
        let target = stage.spawn_entity(request(
            EntityKind::Target,
            Vec2::new(20.0, 0.0),
            Vec2::new(10.0, 0.0),
        ));
        let mut events = Vec::new();

        advance(&mut stage, Duration::from_secs(5), &mut events);
        assert!(stage.is_alive(warning));
        assert!(stage.is_alive(target));
        assert!(events.is_empty());
    }

    #[test]
    fn draining_sounds_empties_the_log() {
        let mut stage = Stage::default();
        stage.play_sound(SoundClip::TargetHit, Vec2::new(22.0, 1.0), 0.5);
        stage.play_sound(SoundClip::DeathHit, Vec2::ZERO, 1.0);

        let drained = stage.drain_sounds();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].clip, SoundClip::TargetHit);
        assert_eq!(drained[1].clip, SoundClip::DeathHit);
        assert!(query::sounds(&stage).is_empty());

        stage.play_sound(SoundClip::Explosion, Vec2::ZERO, 0.8);
        assert_eq!(stage.drain_sounds().len(), 1);
    }

    #[test]
    fn zero_dt_moves_nothing() {
        let mut stage = Stage::default();
        let rock = stage.spawn_entity(request(
            EntityKind::FallingRock,
            Vec2::new(1.0, 12.0),
            Vec2::new(0.0, -20.0),
        ));
        let mut events = Vec::new();
        advance(&mut stage, Duration::ZERO, &mut events);
        let snapshot = query::entity(&stage, rock).expect("rock alive");
        assert_eq!(snapshot.position, Vec2::new(1.0, 12.0));
    }
}
