#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Warning-then-spawn cycle for falling rocks and wolf lines.
//!
//! The cycle is an explicit state machine advanced by [`HazardSpawnCycle::tick`].
//! Waiting is encoded as the current state plus a remaining countdown, so a
//! tick that does not exhaust a countdown simply returns and the next tick
//! resumes counting where this one stopped.

use std::{cell::Cell, rc::Rc, time::Duration};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rockfall_core::{
    ensure_finite, seconds, stream_seed,
    tuning::{SpanTuning, SpawnTuning},
    CameraBounds, ConfigError, EntityHandle, EntityHost, EntityKind, EntityTag, Event, Facing,
    HazardKind, ScaledParameters, Side, SpawnRequest, TimeBase, WolfLine,
};

const ROCK_STREAM: &str = "hazards.rock";
const WOLF_STREAM: &str = "hazards.wolf";

/// Shared flag that asks an in-flight cycle to tear itself down.
///
/// The cycle checks the token at every resume point. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.set(true);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Observable state of the spawn cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnCycleState {
    /// About to choose positions for a new cycle.
    Idle,
    /// Warnings are shown for one blink.
    WarningVisible,
    /// Warnings are hidden between two blinks.
    WarningHidden,
    /// Hazards are being created.
    Spawned,
    /// Waiting for the spawn delay before the next cycle.
    Cooldown,
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Idle,
    WarningVisible { blink: u32, remaining: Duration },
    WarningHidden { blink: u32, remaining: Duration },
    Spawned,
    Cooldown { remaining: Duration },
}

#[derive(Clone, Copy, Debug)]
struct CyclePlan {
    rock_x: f32,
    wolf_line: Option<WolfLine>,
    blink_interval: Duration,
}

#[derive(Clone, Copy, Debug)]
struct Layout {
    rock_spawn_x: SpanTuning,
    rock_spawn_height_offset: f32,
    wolf_spawn_y: SpanTuning,
    wolf_edge_offset: f32,
    wolf_warning_inset: f32,
    blinks_before_drop: u32,
    wolves_per_line: u32,
    wolf_spacing: f32,
}

impl Layout {
    fn new(tuning: &SpawnTuning) -> Result<Self, ConfigError> {
        if tuning.blinks_before_drop == 0 {
            return Err(ConfigError::ZeroCount {
                parameter: "spawning.blinks_before_drop",
            });
        }
        if tuning.wolves_per_line == 0 {
            return Err(ConfigError::ZeroCount {
                parameter: "spawning.wolves_per_line",
            });
        }
        Ok(Self {
            rock_spawn_x: span("spawning.rock_spawn_x", tuning.rock_spawn_x)?,
            rock_spawn_height_offset: ensure_finite(
                "spawning.rock_spawn_height_offset",
                tuning.rock_spawn_height_offset,
            )?,
            wolf_spawn_y: span("spawning.wolf_spawn_y", tuning.wolf_spawn_y)?,
            wolf_edge_offset: ensure_finite("spawning.wolf_edge_offset", tuning.wolf_edge_offset)?,
            wolf_warning_inset: ensure_finite(
                "spawning.wolf_warning_inset",
                tuning.wolf_warning_inset,
            )?,
            blinks_before_drop: tuning.blinks_before_drop,
            wolves_per_line: tuning.wolves_per_line,
            wolf_spacing: ensure_finite("spawning.wolf_spacing", tuning.wolf_spacing)?,
        })
    }
}

fn span(parameter: &'static str, value: SpanTuning) -> Result<SpanTuning, ConfigError> {
    let min = ensure_finite(parameter, value.min)?;
    let max = ensure_finite(parameter, value.max)?;
    if min > max {
        return Err(ConfigError::EmptyRange {
            parameter,
            min,
            max,
        });
    }
    Ok(value)
}

enum Wait {
    Pending(Duration),
    Elapsed,
}

fn wait(budget: &mut Duration, remaining: Duration) -> Wait {
    if *budget < remaining {
        let left = remaining - *budget;
        *budget = Duration::ZERO;
        Wait::Pending(left)
    } else {
        *budget -= remaining;
        Wait::Elapsed
    }
}

/// Endless warning → blink → spawn → cooldown loop owned by one session.
#[derive(Debug)]
pub struct HazardSpawnCycle {
    layout: Layout,
    time_base: TimeBase,
    phase: Phase,
    plan: Option<CyclePlan>,
    warnings: Vec<EntityHandle>,
    hazards: Vec<EntityHandle>,
    seed: u64,
    rock_rng: ChaCha8Rng,
    wolf_rng: ChaCha8Rng,
    token: CancellationToken,
    cycles_completed: u64,
}

impl HazardSpawnCycle {
    /// Validates the tuning and creates an idle cycle.
    ///
    /// `generation` distinguishes consecutive sessions so a restarted session
    /// does not replay the previous hazard layout.
    pub fn new(tuning: &SpawnTuning, generation: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            layout: Layout::new(tuning)?,
            time_base: tuning.time_base,
            phase: Phase::Idle,
            plan: None,
            warnings: Vec::new(),
            hazards: Vec::new(),
            seed: tuning.rng_seed,
            rock_rng: stream(tuning.rng_seed, generation, ROCK_STREAM),
            wolf_rng: stream(tuning.rng_seed, generation, WOLF_STREAM),
            token: CancellationToken::new(),
            cycles_completed: 0,
        })
    }

    /// Tears down the current cycle and starts over for a new session generation.
    ///
    /// The previous token stays cancelled; a fresh one is handed out by
    /// [`HazardSpawnCycle::cancellation_token`].
    pub fn restart<H>(&mut self, generation: u64, host: &mut H)
    where
        H: EntityHost + ?Sized,
    {
        self.teardown(host);
        self.rock_rng = stream(self.seed, generation, ROCK_STREAM);
        self.wolf_rng = stream(self.seed, generation, WOLF_STREAM);
        self.token = CancellationToken::new();
        self.cycles_completed = 0;
    }

    /// Token that cancels this cycle at its next resume point.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Clock selected to drive blink and cooldown waits.
    #[must_use]
    pub const fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Current state of the cycle.
    #[must_use]
    pub const fn state(&self) -> SpawnCycleState {
        match self.phase {
            Phase::Idle => SpawnCycleState::Idle,
            Phase::WarningVisible { .. } => SpawnCycleState::WarningVisible,
            Phase::WarningHidden { .. } => SpawnCycleState::WarningHidden,
            Phase::Spawned => SpawnCycleState::Spawned,
            Phase::Cooldown { .. } => SpawnCycleState::Cooldown,
        }
    }

    /// Warning indicators belonging to the in-flight cycle.
    #[must_use]
    pub fn warnings(&self) -> &[EntityHandle] {
        &self.warnings
    }

    /// Number of warning and hazard handles the cycle would destroy on teardown.
    #[must_use]
    pub fn tracked_handles(&self) -> usize {
        self.warnings.len() + self.hazards.len()
    }

    /// Number of cycles that reached the spawn step.
    #[must_use]
    pub const fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Advances the cycle by `dt`.
    ///
    /// `parameters` must already reflect any difficulty change that happened
    /// this tick. At most one new cycle begins per call, so a huge `dt` cannot
    /// flood the world with hazards.
    pub fn tick<H>(
        &mut self,
        dt: Duration,
        parameters: &ScaledParameters,
        wolves_enabled: bool,
        host: &mut H,
        out: &mut Vec<Event>,
    ) where
        H: EntityHost + ?Sized,
    {
        let mut budget = dt;
        let mut began_cycle = false;

        loop {
            if self.token.is_cancelled() {
                self.teardown(host);
                return;
            }

            match self.phase {
                Phase::Idle => {
                    if began_cycle {
                        return;
                    }
                    began_cycle = true;
                    self.begin_cycle(parameters, wolves_enabled, host, out);
                }
                Phase::WarningVisible { blink, remaining } => match wait(&mut budget, remaining) {
                    Wait::Pending(left) => {
                        self.phase = Phase::WarningVisible {
                            blink,
                            remaining: left,
                        };
                        return;
                    }
                    Wait::Elapsed => {
                        if blink + 1 < self.layout.blinks_before_drop {
                            self.set_warnings_visible(host, false);
                            self.phase = Phase::WarningHidden {
                                blink,
                                remaining: self.blink_interval() / 2,
                            };
                        } else {
                            self.phase = Phase::Spawned;
                        }
                    }
                },
                Phase::WarningHidden { blink, remaining } => match wait(&mut budget, remaining) {
                    Wait::Pending(left) => {
                        self.phase = Phase::WarningHidden {
                            blink,
                            remaining: left,
                        };
                        return;
                    }
                    Wait::Elapsed => {
                        self.set_warnings_visible(host, true);
                        self.phase = Phase::WarningVisible {
                            blink: blink + 1,
                            remaining: self.blink_interval(),
                        };
                    }
                },
                Phase::Spawned => {
                    self.spawn_hazards(parameters, host, out);
                    self.clear_warnings(host);
                    self.cycles_completed += 1;
                    self.phase = Phase::Cooldown {
                        remaining: seconds(parameters.spawn_delay),
                    };
                }
                Phase::Cooldown { remaining } => match wait(&mut budget, remaining) {
                    Wait::Pending(left) => {
                        self.phase = Phase::Cooldown { remaining: left };
                        return;
                    }
                    Wait::Elapsed => {
                        self.plan = None;
                        self.phase = Phase::Idle;
                    }
                },
            }
        }
    }

    /// Destroys every tracked warning and hazard and returns to idle.
    pub fn teardown<H>(&mut self, host: &mut H)
    where
        H: EntityHost + ?Sized,
    {
        let destroyed = self.tracked_handles();
        for handle in self.warnings.drain(..).chain(self.hazards.drain(..)) {
            host.destroy_entity(handle);
        }
        self.plan = None;
        self.phase = Phase::Idle;
        log::debug!(target: "hazards", "spawn cycle torn down, {destroyed} handles destroyed");
    }

    fn blink_interval(&self) -> Duration {
        self.plan
            .map(|plan| plan.blink_interval)
            .unwrap_or(Duration::ZERO)
    }

    fn begin_cycle<H>(
        &mut self,
        parameters: &ScaledParameters,
        wolves_enabled: bool,
        host: &mut H,
        out: &mut Vec<Event>,
    ) where
        H: EntityHost + ?Sized,
    {
        let camera = camera_or_fallback(&*host);
        let rock_x = self
            .rock_rng
            .gen_range(self.layout.rock_spawn_x.min..=self.layout.rock_spawn_x.max);

        let wolf_line = if wolves_enabled {
            let side = if self.wolf_rng.gen_bool(0.5) {
                Side::Left
            } else {
                Side::Right
            };
            let y = self
                .wolf_rng
                .gen_range(self.layout.wolf_spawn_y.min..=self.layout.wolf_spawn_y.max);
            Some(WolfLine { side, y })
        } else {
            None
        };

        let rock_warning_at = Vec2::new(rock_x, camera.center.y);
        if !camera.contains(rock_warning_at) {
            log::debug!(
                target: "hazards",
                "rock warning at x={rock_x:.2} lies outside the camera view"
            );
        }
        let placeholder = sprite_missing(&*host, EntityKind::RockWarning);
        let rock_warning = host.spawn_entity(SpawnRequest {
            kind: EntityKind::RockWarning,
            position: rock_warning_at,
            velocity: Vec2::ZERO,
            facing: Facing::Right,
            tag: EntityTag::Cosmetic,
            placeholder,
        });
        self.warnings.push(rock_warning);

        if let Some(line) = wolf_line {
            let x =
                camera.edge(line.side) + line.side.travel_sign() * self.layout.wolf_warning_inset;
            let placeholder = sprite_missing(&*host, EntityKind::WolfWarning);
            let wolf_warning = host.spawn_entity(SpawnRequest {
                kind: EntityKind::WolfWarning,
                position: Vec2::new(x, line.y),
                velocity: Vec2::ZERO,
                facing: line.side.facing(),
                tag: EntityTag::Cosmetic,
                placeholder,
            });
            self.warnings.push(wolf_warning);
        }

        self.plan = Some(CyclePlan {
            rock_x,
            wolf_line,
            blink_interval: seconds(parameters.blink_interval),
        });
        self.set_warnings_visible(host, true);
        self.phase = Phase::WarningVisible {
            blink: 0,
            remaining: self.blink_interval(),
        };

        log::debug!(
            target: "hazards",
            "cycle {} posted warnings: rock x={rock_x:.2}, wolves {wolf_line:?}",
            self.cycles_completed + 1
        );
        out.push(Event::WarningsPosted { rock_x, wolf_line });
    }

    fn spawn_hazards<H>(
        &mut self,
        parameters: &ScaledParameters,
        host: &mut H,
        out: &mut Vec<Event>,
    ) where
        H: EntityHost + ?Sized,
    {
        let Some(plan) = self.plan else {
            return;
        };
        let camera = camera_or_fallback(&*host);
        self.hazards.retain(|handle| host.is_alive(*handle));

        let placeholder = sprite_missing(&*host, EntityKind::FallingRock);
        let rock = host.spawn_entity(SpawnRequest {
            kind: EntityKind::FallingRock,
            position: Vec2::new(
                plan.rock_x,
                camera.top() + self.layout.rock_spawn_height_offset,
            ),
            velocity: Vec2::new(0.0, -parameters.rock_fall_speed),
            facing: Facing::Right,
            tag: EntityTag::Damage,
            placeholder,
        });
        self.hazards.push(rock);
        out.push(Event::HazardSpawned {
            kind: HazardKind::Rock,
            handle: rock,
        });

        let Some(line) = plan.wolf_line else {
            return;
        };
        let sign = line.side.travel_sign();
        let lead_x = camera.edge(line.side) - sign * self.layout.wolf_edge_offset;
        let placeholder = sprite_missing(&*host, EntityKind::Wolf);
        for index in 0..self.layout.wolves_per_line {
            let x = lead_x - sign * self.layout.wolf_spacing * index as f32;
            let wolf = host.spawn_entity(SpawnRequest {
                kind: EntityKind::Wolf,
                position: Vec2::new(x, line.y),
                velocity: Vec2::new(sign * parameters.wolf_move_speed, 0.0),
                facing: line.side.travel_facing(),
                tag: EntityTag::Lethal,
                placeholder,
            });
            self.hazards.push(wolf);
            out.push(Event::HazardSpawned {
                kind: HazardKind::Wolf,
                handle: wolf,
            });
        }
    }

    fn clear_warnings<H>(&mut self, host: &mut H)
    where
        H: EntityHost + ?Sized,
    {
        for handle in self.warnings.drain(..) {
            host.destroy_entity(handle);
        }
    }

    fn set_warnings_visible<H>(&self, host: &mut H, visible: bool)
    where
        H: EntityHost + ?Sized,
    {
        for handle in &self.warnings {
            host.set_visible(*handle, visible);
        }
    }
}

fn stream(seed: u64, generation: u64, label: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(stream_seed(seed, generation, label))
}

fn camera_or_fallback<H>(host: &H) -> CameraBounds
where
    H: EntityHost + ?Sized,
{
    host.camera_bounds().unwrap_or_else(|| {
        log::warn!(target: "hazards", "camera unavailable, using fallback bounds");
        CameraBounds::FALLBACK
    })
}

fn sprite_missing<H>(host: &H, kind: EntityKind) -> bool
where
    H: EntityHost + ?Sized,
{
    let missing = !host.has_sprite(kind);
    if missing {
        log::warn!(target: "hazards", "sprite for {kind:?} unavailable, drawing placeholder");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_carries_leftover_budget() {
        let mut budget = Duration::from_millis(700);
        assert!(matches!(
            wait(&mut budget, Duration::from_millis(400)),
            Wait::Elapsed
        ));
        assert_eq!(budget, Duration::from_millis(300));
        match wait(&mut budget, Duration::from_millis(500)) {
            Wait::Pending(left) => assert_eq!(left, Duration::from_millis(200)),
            Wait::Elapsed => panic!("budget should not cover the wait"),
        }
        assert_eq!(budget, Duration::ZERO);
    }

    #[test]
    fn zero_wait_elapses_with_empty_budget() {
        let mut budget = Duration::ZERO;
        assert!(matches!(wait(&mut budget, Duration::ZERO), Wait::Elapsed));
    }

    #[test]
    fn layout_rejects_empty_ranges() {
        let tuning = SpawnTuning {
            wolf_spawn_y: SpanTuning::new(3.0, -3.0),
            ..SpawnTuning::default()
        };
        let error = Layout::new(&tuning).expect_err("empty range must be rejected");
        assert_eq!(
            error,
            ConfigError::EmptyRange {
                parameter: "spawning.wolf_spawn_y",
                min: 3.0,
                max: -3.0,
            }
        );
    }
}
