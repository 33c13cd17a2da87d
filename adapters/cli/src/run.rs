use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use glam::Vec2;
use rockfall_core::{tuning::GameTuning, Command, Event, SessionOutcome};
use rockfall_session::Session;
use rockfall_world::{self as world, query, Stage};

/// Where the simulated player stands when the scripted death triggers.
const PLAYER_POSITION: Vec2 = Vec2::new(0.0, -8.0);

/// Scripted inputs for one headless run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunPlan {
    /// Wall time to simulate.
    pub(crate) duration: Duration,
    /// Fixed frame delta.
    pub(crate) frame: Duration,
    /// Wall time between scripted target hits, if any.
    pub(crate) hit_every: Option<Duration>,
    /// Session time to skip before starting.
    pub(crate) fast_forward: Duration,
    /// Session time at which the player dies, if ever.
    pub(crate) die_at: Option<f32>,
}

/// Tally printed once the run finishes.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Summary {
    pub(crate) elapsed_secs: f32,
    pub(crate) level: u32,
    pub(crate) danger_phase: bool,
    pub(crate) score: u64,
    pub(crate) hits: u32,
    pub(crate) cycles: u64,
    pub(crate) hazards_spawned: usize,
    pub(crate) hazards_despawned: usize,
    pub(crate) sounds_played: usize,
    pub(crate) outcome: Option<SessionOutcome>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Some(SessionOutcome::Survived) => "survived",
            Some(SessionOutcome::Died) => "died",
            None => "in progress",
        };
        writeln!(f, "outcome:  {outcome}")?;
        writeln!(f, "elapsed:  {:.2}s", self.elapsed_secs)?;
        writeln!(
            f,
            "level:    {}{}",
            self.level,
            if self.danger_phase { " (danger)" } else { "" }
        )?;
        writeln!(f, "score:    {} from {} hits", self.score, self.hits)?;
        writeln!(
            f,
            "hazards:  {} spawned over {} cycles, {} left the screen",
            self.hazards_spawned, self.cycles, self.hazards_despawned
        )?;
        write!(f, "sounds:   {}", self.sounds_played)
    }
}

/// Drives a session against a headless stage until the plan runs out or the session ends.
pub(crate) fn run(tuning: &GameTuning, plan: RunPlan) -> Result<Summary> {
    let mut session = Session::new(tuning).context("tuning rejected by the session")?;
    let mut stage = Stage::new(tuning.camera);
    let mut events = Vec::new();
    let mut hazards_spawned = 0;
    let mut hazards_despawned = 0;
    let mut sounds_played = 0;

    if !plan.fast_forward.is_zero() {
        session.apply(
            Command::FastForward {
                by: plan.fast_forward,
            },
            &mut stage,
            &mut events,
        );
    }
    session.apply(Command::SpawnTarget, &mut stage, &mut events);
    session.apply(Command::StartSession, &mut stage, &mut events);

    let mut wall = Duration::ZERO;
    let mut next_hit = plan.hit_every;
    while wall < plan.duration && session.outcome().is_none() {
        session.apply(Command::Tick { dt: plan.frame }, &mut stage, &mut events);
        wall += plan.frame;

        if let (Some(at), Some(every)) = (next_hit, plan.hit_every) {
            if wall >= at {
                next_hit = Some(at + every);
                if let Some(&target) = session.targets().first() {
                    let position = query::entity(&stage, target)
                        .map_or(Vec2::ZERO, |snapshot| snapshot.position);
                    session.apply(
                        Command::RegisterHit { target, position },
                        &mut stage,
                        &mut events,
                    );
                }
            }
        }

        if let Some(die_at) = plan.die_at {
            if session.elapsed_secs() >= die_at && !session.is_frozen() {
                session.apply(
                    Command::TriggerDeath {
                        position: PLAYER_POSITION,
                    },
                    &mut stage,
                    &mut events,
                );
            }
        }

        let session_dt = events.iter().find_map(|event| match event {
            Event::TimeAdvanced { session, .. } => Some(*session),
            _ => None,
        });
        if let Some(dt) = session_dt {
            world::advance(&mut stage, dt, &mut events);
        }

        for sound in stage.drain_sounds() {
            log::trace!(target: "cli", "{:?} at {} ({:.2})", sound.clip, sound.position, sound.volume);
            sounds_played += 1;
        }

        for event in events.drain(..) {
            match event {
                Event::TimeAdvanced { .. } => {}
                Event::HazardSpawned { .. } => hazards_spawned += 1,
                Event::HazardDespawned { .. } => hazards_despawned += 1,
                other => log::debug!(target: "cli", "{other:?}"),
            }
        }
    }

    Ok(Summary {
        elapsed_secs: session.elapsed_secs(),
        level: session.level(),
        danger_phase: session.is_danger_phase(),
        score: session.score(),
        hits: session.hits(),
        cycles: session.cycles_completed(),
        hazards_spawned,
        hazards_despawned,
        sounds_played,
        outcome: session.outcome(),
    })
}
