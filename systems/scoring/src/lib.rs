#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-based point values and the running score ledger.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rockfall_core::{
    ensure_finite, ensure_positive, stream_seed,
    tuning::{ScoreTuning, SpanTuning, TargetTuning},
    ConfigError, EntityHandle, EntityHost, EntityKind, EntityTag, Event, Facing, SoundClip,
    SpawnRequest,
};

const TARGET_STREAM: &str = "targets";

/// Piecewise-linear point value schedule that steepens after the danger phase starts.
#[derive(Clone, Copy, Debug)]
pub struct PointSchedule {
    base_points: u32,
    normal_increment: u32,
    danger_increment: u32,
    interval: f32,
    danger_start_interval: u32,
}

impl PointSchedule {
    /// Validates the schedule. `danger_phase_start` is shared with the phase tracker.
    pub fn new(tuning: &ScoreTuning, danger_phase_start: f32) -> Result<Self, ConfigError> {
        let interval = ensure_positive(
            "scoring.point_increase_interval",
            tuning.point_increase_interval,
        )?;
        let danger_phase_start = ensure_finite("phases.danger_phase_start", danger_phase_start)?;
        Ok(Self {
            base_points: tuning.base_points,
            normal_increment: tuning.normal_increment,
            danger_increment: tuning.danger_increment,
            interval,
            danger_start_interval: whole_intervals(danger_phase_start, interval),
        })
    }

    /// Points awarded for a hit at `elapsed_secs`. Negative time clamps to zero.
    #[must_use]
    pub fn current_point_value(&self, elapsed_secs: f32) -> u32 {
        let intervals = whole_intervals(elapsed_secs, self.interval);
        let normal = intervals.min(self.danger_start_interval);
        let danger = intervals.saturating_sub(self.danger_start_interval);
        self.base_points
            .saturating_add(normal.saturating_mul(self.normal_increment))
            .saturating_add(danger.saturating_mul(self.danger_increment))
    }
}

fn whole_intervals(elapsed_secs: f32, interval: f32) -> u32 {
    if elapsed_secs.is_nan() || elapsed_secs <= 0.0 {
        return 0;
    }
    (elapsed_secs / interval).floor() as u32
}

#[derive(Debug)]
struct TargetPlacer {
    left_x: f32,
    right_x: f32,
    spawn_y: SpanTuning,
    seed: u64,
    rng: ChaCha8Rng,
}

impl TargetPlacer {
    fn new(tuning: &TargetTuning, generation: u64) -> Result<Self, ConfigError> {
        let min = ensure_finite("targets.spawn_y", tuning.spawn_y.min)?;
        let max = ensure_finite("targets.spawn_y", tuning.spawn_y.max)?;
        if min > max {
            return Err(ConfigError::EmptyRange {
                parameter: "targets.spawn_y",
                min,
                max,
            });
        }
        Ok(Self {
            left_x: ensure_finite("targets.left_x", tuning.left_x)?,
            right_x: ensure_finite("targets.right_x", tuning.right_x)?,
            spawn_y: tuning.spawn_y,
            seed: tuning.rng_seed,
            rng: target_stream(tuning.rng_seed, generation),
        })
    }

    fn reseed(&mut self, generation: u64) {
        self.rng = target_stream(self.seed, generation);
    }

    fn next_request(&mut self, placeholder: bool) -> SpawnRequest {
        let (x, facing) = if self.rng.gen_bool(0.5) {
            (self.left_x, Facing::Right)
        } else {
            (self.right_x, Facing::Left)
        };
        let y = self.rng.gen_range(self.spawn_y.min..=self.spawn_y.max);
        SpawnRequest {
            kind: EntityKind::Target,
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            facing,
            tag: EntityTag::Target,
            placeholder,
        }
    }
}

/// Running score plus the targets it hands out points for.
#[derive(Debug)]
pub struct Scoring {
    schedule: PointSchedule,
    placer: TargetPlacer,
    hit_volume: f32,
    total: u64,
    hits: u32,
    targets: Vec<EntityHandle>,
}

impl Scoring {
    /// Creates an empty ledger.
    pub fn new(
        score: &ScoreTuning,
        targets: &TargetTuning,
        danger_phase_start: f32,
        generation: u64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            schedule: PointSchedule::new(score, danger_phase_start)?,
            placer: TargetPlacer::new(targets, generation)?,
            hit_volume: ensure_finite("scoring.hit_volume", score.hit_volume)?,
            total: 0,
            hits: 0,
            targets: Vec::new(),
        })
    }

    /// Point value schedule used by this ledger.
    #[must_use]
    pub const fn schedule(&self) -> &PointSchedule {
        &self.schedule
    }

    /// Total points scored.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of scored hits.
    #[must_use]
    pub const fn hits(&self) -> u32 {
        self.hits
    }

    /// Targets currently owned by the ledger.
    #[must_use]
    pub fn targets(&self) -> &[EntityHandle] {
        &self.targets
    }

    /// Places a target on a random screen side.
    pub fn spawn_target<H>(&mut self, host: &mut H, out: &mut Vec<Event>) -> EntityHandle
    where
        H: EntityHost + ?Sized,
    {
        let placeholder = !host.has_sprite(EntityKind::Target);
        if placeholder {
            log::warn!(target: "scoring", "target sprite unavailable, drawing placeholder");
        }
        let request = self.placer.next_request(placeholder);
        let handle = host.spawn_entity(request);
        self.targets.push(handle);
        out.push(Event::TargetSpawned {
            handle,
            position: request.position,
        });
        handle
    }

    /// Scores a hit on `target` and replaces it with a fresh target.
    ///
    /// Returns the points awarded, or `None` when the target is not one this
    /// ledger placed, which also covers a second hit on an already replaced target.
    pub fn register_hit<H>(
        &mut self,
        target: EntityHandle,
        position: Vec2,
        elapsed_secs: f32,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Option<u32>
    where
        H: EntityHost + ?Sized,
    {
        let index = self.targets.iter().position(|handle| *handle == target)?;
        let _ = self.targets.swap_remove(index);

        let points = self.schedule.current_point_value(elapsed_secs);
        self.total = self.total.saturating_add(u64::from(points));
        self.hits = self.hits.saturating_add(1);

        host.play_sound(SoundClip::TargetHit, position, self.hit_volume);
        host.destroy_entity(target);
        out.push(Event::PointsAwarded {
            points,
            total: self.total,
            position,
        });
        log::debug!(
            target: "scoring",
            "hit #{} at {elapsed_secs:.2}s worth {points}, total {}",
            self.hits,
            self.total
        );

        let _ = self.spawn_target(host, out);
        Some(points)
    }

    /// Removes every owned target and clears the ledger.
    pub fn reset<H>(&mut self, host: &mut H)
    where
        H: EntityHost + ?Sized,
    {
        for handle in self.targets.drain(..) {
            host.destroy_entity(handle);
        }
        self.total = 0;
        self.hits = 0;
    }

    /// Switches target placement to the stream of a new session generation.
    pub fn reseed(&mut self, generation: u64) {
        self.placer.reseed(generation);
    }
}

fn target_stream(seed: u64, generation: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(stream_seed(seed, generation, TARGET_STREAM))
}

#[cfg(test)]
mod tests {
    use super::whole_intervals;

    #[test]
    fn whole_intervals_clamps_negative_and_nan() {
        assert_eq!(whole_intervals(-4.0, 15.0), 0);
        assert_eq!(whole_intervals(f32::NAN, 15.0), 0);
        assert_eq!(whole_intervals(14.99, 15.0), 0);
        assert_eq!(whole_intervals(15.0, 15.0), 1);
    }
}
