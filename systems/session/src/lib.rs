#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session orchestrator wiring the difficulty clock, phase latches, hazard
//! spawn cycle, and score ledger together.
//!
//! Within one [`Command::Tick`] the order is fixed: clocks advance, the
//! difficulty level is re-derived, the danger blend advances, the phase
//! latches are evaluated, and only then does the spawn cycle consume the
//! current parameters.

use std::time::Duration;

use glam::Vec2;
use rockfall_core::{
    ensure_finite, seconds, tuning::GameTuning, Command, ConfigError, EntityHandle, EntityHost,
    Event, ScaledParameters, SessionOutcome, SoundClip,
};
use rockfall_system_difficulty::{DifficultyClock, ScalingPolicy};
use rockfall_system_hazard_spawning::{CancellationToken, HazardSpawnCycle, SpawnCycleState};
use rockfall_system_phases::PhaseTracker;
use rockfall_system_scoring::Scoring;

/// Stretch of the death sequence the session is in.
#[derive(Clone, Copy, Debug, PartialEq)]
enum DeathStage {
    /// World frozen right after the fatal hit.
    Hitstop { remaining: Duration, position: Vec2 },
    /// Explosion played, waiting before the session ends.
    Aftermath { remaining: Duration },
}

/// One playthrough from start to death, survival, or reset.
#[derive(Debug)]
pub struct Session {
    clock: DifficultyClock,
    scaling: ScalingPolicy,
    parameters: ScaledParameters,
    phases: PhaseTracker,
    cycle: HazardSpawnCycle,
    token: CancellationToken,
    scoring: Scoring,
    presentation: Duration,
    hitstop: Duration,
    death_screen_delay: Duration,
    time_limit: Option<f32>,
    death_volume: f32,
    explosion_volume: f32,
    dying: Option<DeathStage>,
    outcome: Option<SessionOutcome>,
    generation: u64,
}

impl Session {
    /// Validates every tuning section and creates a session that has not started.
    pub fn new(tuning: &GameTuning) -> Result<Self, ConfigError> {
        let scaling = ScalingPolicy::new(&tuning.scaling)?;
        let phases = PhaseTracker::new(&tuning.phases)?;
        let cycle = HazardSpawnCycle::new(&tuning.spawning, 0)?;
        let token = cycle.cancellation_token();
        let time_limit = match tuning.session.limit() {
            Some(limit) => Some(ensure_finite("session.time_limit", limit)?),
            None => None,
        };
        Ok(Self {
            clock: DifficultyClock::new(&tuning.difficulty)?,
            parameters: scaling.scale_for(0),
            scaling,
            scoring: Scoring::new(
                &tuning.scoring,
                &tuning.targets,
                phases.danger_phase_start(),
                0,
            )?,
            phases,
            cycle,
            token,
            presentation: Duration::ZERO,
            hitstop: seconds(ensure_finite(
                "session.hitstop_duration",
                tuning.session.hitstop_duration,
            )?),
            death_screen_delay: seconds(ensure_finite(
                "session.death_screen_delay",
                tuning.session.death_screen_delay,
            )?),
            time_limit,
            death_volume: ensure_finite("session.death_volume", tuning.session.death_volume)?,
            explosion_volume: ensure_finite(
                "session.explosion_volume",
                tuning.session.explosion_volume,
            )?,
            dying: None,
            outcome: None,
            generation: 0,
        })
    }

    /// Applies a command, forwarding entity work to `host` and broadcasting what happened.
    pub fn apply<H>(&mut self, command: Command, host: &mut H, out: &mut Vec<Event>)
    where
        H: EntityHost + ?Sized,
    {
        match command {
            Command::StartSession => self.start(out),
            Command::Tick { dt } => self.tick(dt, host, out),
            Command::Pause => {
                if self.clock.is_running() {
                    log::info!(target: "session", "paused at {:.2}s", self.elapsed_secs());
                }
                self.clock.pause();
            }
            Command::Resume => {
                if !self.clock.is_running() {
                    log::info!(target: "session", "resumed at {:.2}s", self.elapsed_secs());
                }
                self.clock.resume();
            }
            Command::FastForward { by } => {
                self.clock.fast_forward(by);
                self.refresh_difficulty(out);
                self.phases.update(self.clock.elapsed_secs(), out);
                self.check_time_limit(host, out);
            }
            Command::ResetSession => self.reset(host, out),
            Command::SpawnTarget => {
                if self.outcome.is_none() {
                    let _ = self.scoring.spawn_target(host, out);
                }
            }
            Command::RegisterHit { target, position } => {
                if self.is_frozen() {
                    log::debug!(target: "session", "hit ignored while the session is frozen");
                    return;
                }
                let elapsed = self.clock.elapsed_secs();
                if self
                    .scoring
                    .register_hit(target, position, elapsed, host, out)
                    .is_some()
                {
                    self.start(out);
                }
            }
            Command::TriggerDeath { position } => {
                if self.is_frozen() {
                    return;
                }
                log::info!(
                    target: "session",
                    "player died at {:.2}s with {} points",
                    self.elapsed_secs(),
                    self.score()
                );
                self.dying = Some(DeathStage::Hitstop {
                    remaining: self.hitstop,
                    position,
                });
                host.play_sound(SoundClip::DeathHit, position, self.death_volume);
                out.push(Event::PlayerDied);
            }
        }
    }

    fn start(&mut self, out: &mut Vec<Event>) {
        if self.outcome.is_some() || !self.clock.start() {
            return;
        }
        log::info!(target: "session", "session started");
        out.push(Event::SessionStarted);
    }

    fn tick<H>(&mut self, dt: Duration, host: &mut H, out: &mut Vec<Event>)
    where
        H: EntityHost + ?Sized,
    {
        let session_dt = if self.is_frozen() {
            Duration::ZERO
        } else {
            self.clock.advance(dt)
        };
        self.presentation = self.presentation.saturating_add(dt);
        out.push(Event::TimeAdvanced {
            session: session_dt,
            presentation: dt,
        });

        self.refresh_difficulty(out);

        let blend_dt = self.phases.blend_time_base().select(session_dt, dt);
        let _ = self.phases.transition_progress(blend_dt);
        self.phases.update(self.clock.elapsed_secs(), out);

        if self.clock.is_started() && !self.is_frozen() {
            let cycle_dt = self.cycle.time_base().select(session_dt, dt);
            if !cycle_dt.is_zero() {
                self.cycle.tick(
                    cycle_dt,
                    &self.parameters,
                    self.phases.wolves_enabled(),
                    host,
                    out,
                );
            }
        }

        self.advance_death(dt, host, out);
        self.check_time_limit(host, out);
    }

    /// Runs the death sequence on presentation time, carrying leftover time
    /// from the hitstop into the aftermath.
    fn advance_death<H>(&mut self, dt: Duration, host: &mut H, out: &mut Vec<Event>)
    where
        H: EntityHost + ?Sized,
    {
        let mut budget = dt;
        while let Some(stage) = self.dying {
            match stage {
                DeathStage::Hitstop { remaining, position } => {
                    if budget < remaining {
                        self.dying = Some(DeathStage::Hitstop {
                            remaining: remaining - budget,
                            position,
                        });
                        return;
                    }
                    budget -= remaining;
                    host.play_sound(SoundClip::Explosion, position, self.explosion_volume);
                    log::debug!(target: "session", "hitstop over");
                    self.dying = Some(DeathStage::Aftermath {
                        remaining: self.death_screen_delay,
                    });
                }
                DeathStage::Aftermath { remaining } => {
                    if budget < remaining {
                        self.dying = Some(DeathStage::Aftermath {
                            remaining: remaining - budget,
                        });
                        return;
                    }
                    self.dying = None;
                    self.finish(SessionOutcome::Died, host, out);
                }
            }
        }
    }

    fn refresh_difficulty(&mut self, out: &mut Vec<Event>) {
        if let Some(level) = self.clock.observe_level_change() {
            self.parameters = self.scaling.scale_for(level);
            log::info!(
                target: "difficulty",
                "level {level}: blink {:.3}s, rock {:.2}, wolf {:.2}, delay {:.3}s",
                self.parameters.blink_interval,
                self.parameters.rock_fall_speed,
                self.parameters.wolf_move_speed,
                self.parameters.spawn_delay
            );
            out.push(Event::DifficultyLevelChanged {
                level,
                parameters: self.parameters,
            });
        }
    }

    fn check_time_limit<H>(&mut self, host: &mut H, out: &mut Vec<Event>)
    where
        H: EntityHost + ?Sized,
    {
        if self.is_frozen() {
            return;
        }
        if let Some(limit) = self.time_limit {
            if self.clock.elapsed_secs() >= limit {
                self.finish(SessionOutcome::Survived, host, out);
            }
        }
    }

    /// Ends the session and tears down whatever the spawn cycle still owns.
    fn finish<H>(&mut self, outcome: SessionOutcome, host: &mut H, out: &mut Vec<Event>)
    where
        H: EntityHost + ?Sized,
    {
        self.token.cancel();
        self.cycle.teardown(host);
        self.outcome = Some(outcome);
        log::info!(
            target: "session",
            "session ended: {outcome:?} with {} points after {:.2}s",
            self.score(),
            self.elapsed_secs()
        );
        out.push(Event::SessionEnded {
            outcome,
            score: self.score(),
        });
    }

    fn reset<H>(&mut self, host: &mut H, out: &mut Vec<Event>)
    where
        H: EntityHost + ?Sized,
    {
        self.token.cancel();
        self.generation = self.generation.wrapping_add(1);
        self.cycle.restart(self.generation, host);
        self.token = self.cycle.cancellation_token();
        self.scoring.reset(host);
        self.scoring.reseed(self.generation);

        self.clock.reset();
        self.phases.reset();
        self.parameters = self.scaling.scale_for(0);
        self.presentation = Duration::ZERO;
        self.dying = None;
        self.outcome = None;

        log::info!(target: "session", "session reset, generation {}", self.generation);
        out.push(Event::SessionReset);
    }

    /// Reports whether the session clock is held by the death sequence or the end of the session.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.dying.is_some() || self.outcome.is_some()
    }

    /// Session seconds elapsed since start, fast-forwards included.
    #[must_use]
    pub fn elapsed_secs(&self) -> f32 {
        self.clock.elapsed_secs()
    }

    /// Presentation time accumulated since construction or the last reset.
    #[must_use]
    pub const fn presentation_elapsed(&self) -> Duration {
        self.presentation
    }

    /// Seconds left before the time limit, if one is configured.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<f32> {
        self.time_limit
            .map(|limit| (limit - self.clock.elapsed_secs()).max(0.0))
    }

    /// Points a hit would be worth right now.
    #[must_use]
    pub fn current_point_value(&self) -> u32 {
        self.scoring
            .schedule()
            .current_point_value(self.clock.elapsed_secs())
    }

    /// Hazard parameters for the current level.
    #[must_use]
    pub const fn parameters(&self) -> &ScaledParameters {
        &self.parameters
    }

    /// Current difficulty level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.clock.current_level()
    }

    /// Reports whether the session clock has started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.clock.is_started()
    }

    /// Reports whether the session clock is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        !self.clock.is_running()
    }

    /// Reports whether the danger phase is active.
    #[must_use]
    pub const fn is_danger_phase(&self) -> bool {
        self.phases.is_danger_phase()
    }

    /// Reports whether wolf lines are enabled.
    #[must_use]
    pub const fn wolves_enabled(&self) -> bool {
        self.phases.wolves_enabled()
    }

    /// Danger colour blend progress in `0.0..=1.0`.
    #[must_use]
    pub const fn blend_progress(&self) -> f32 {
        self.phases.blend_progress()
    }

    /// Total points scored.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.scoring.total()
    }

    /// Number of scored hits.
    #[must_use]
    pub const fn hits(&self) -> u32 {
        self.scoring.hits()
    }

    /// Current state of the hazard spawn cycle.
    #[must_use]
    pub const fn cycle_state(&self) -> SpawnCycleState {
        self.cycle.state()
    }

    /// Number of warning and hazard handles owned by the spawn cycle.
    #[must_use]
    pub fn tracked_hazards(&self) -> usize {
        self.cycle.tracked_handles()
    }

    /// Number of completed spawn cycles in this generation.
    #[must_use]
    pub const fn cycles_completed(&self) -> u64 {
        self.cycle.cycles_completed()
    }

    /// Handles of the targets currently in play.
    #[must_use]
    pub fn targets(&self) -> &[EntityHandle] {
        self.scoring.targets()
    }

    /// How the session ended, if it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Number of resets performed so far.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}
