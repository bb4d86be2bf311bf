//! Runtime side of a match: the shared state, the periodic tasks and the
//! phase machine that walks a session from the start screen through rounds.

mod shared;
mod state_awaiting;
mod state_countdown;
mod state_loadout;
mod state_round_end;
mod tasks;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub use shared::{ArenaState, Shared};
pub use state_awaiting::{Blink, BlinkTimer};
pub use state_countdown::script as countdown_script;
pub use state_loadout::{CursorMove, LoadoutCursor};

use crate::config::{ArenaOptions, GameConfig};
use crate::controller::{ControllerDriver, DemoPilot};
use crate::error::EngineError;
use crate::game::collision;
use crate::game::entity::PlayerId;
use crate::game::session::{GameStatus, RoundSummary, SessionState};
use crate::game::world::World;
use crate::sprite::SpriteService;
use crate::sprite::mock::MockSpriteService;
use tasks::{TaskContext, TaskSet};

/// Where the session currently is. Published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    AwaitingStart,
    SelectingLoadout,
    Countdown {
        round: u32,
    },
    InRound {
        round: u32,
    },
    RoundEnd {
        status: GameStatus,
    },
    MatchEnd {
        winner: PlayerId,
    },
}

/// Owns one session: the shared state, the controller and the phase
/// machine. Rounds are played one at a time through [`Arena::play_round`].
pub struct Arena {
    ctx: TaskContext,
    phase: watch::Sender<SessionPhase>,
}

impl Arena {
    pub fn new(
        config: GameConfig,
        sprites: Box<dyn SpriteService>,
        controller: Arc<dyn ControllerDriver>,
    ) -> Self {
        let shared = Arc::new(Shared::new(&config, sprites));
        let (phase, _) = watch::channel(SessionPhase::Idle);
        Self {
            ctx: TaskContext {
                shared,
                config: Arc::new(config),
                controller,
            },
            phase,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.ctx.config
    }

    pub fn phases(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Snapshot of the session counters.
    pub fn session(&self) -> SessionState {
        self.ctx.shared.lock().session.clone()
    }

    fn publish(&self, phase: SessionPhase) {
        debug!(?phase, "phase");
        self.phase.send_replace(phase);
    }

    /// Plays one round end to end: menus when a match is starting, then
    /// countdown, play until a terminal status, and the result banners.
    pub async fn play_round(&mut self) -> anyhow::Result<RoundSummary> {
        let first_round = self.ctx.shared.lock().session.is_first_round();
        if first_round {
            self.publish(SessionPhase::AwaitingStart);
            state_awaiting::run(&self.ctx)
                .await
                .context("showing the start screen")?;
            if self.ctx.config.is_duel() {
                self.publish(SessionPhase::SelectingLoadout);
                let picks = state_loadout::run(&self.ctx)
                    .await
                    .context("selecting loadouts")?;
                info!(?picks, "loadouts chosen");
            }
        }

        let round = self.build_round()?;
        self.publish(SessionPhase::Countdown { round });
        state_countdown::run(&self.ctx, round).await;

        self.ctx.shared.clear_fire();
        let tasks = TaskSet::spawn_round(&self.ctx);
        self.publish(SessionPhase::InRound { round });
        info!(round, "round started");

        let played = self.run_engine().await;
        tasks.shutdown().await;
        let status = match played {
            Ok(status) => status,
            Err(err) => {
                self.teardown_world();
                return Err(anyhow::Error::new(err).context("running the collision engine"));
            }
        };

        self.publish(SessionPhase::RoundEnd { status });
        let summary = state_round_end::run(&self.ctx).await;
        if let Some(winner) = summary.match_winner {
            self.publish(SessionPhase::MatchEnd { winner });
            state_round_end::match_end(&self.ctx, winner).await;
        }
        self.teardown_world();
        Ok(summary)
    }

    /// Plays `rounds` rounds, or forever when `None`.
    pub async fn run(&mut self, rounds: Option<usize>) -> anyhow::Result<Vec<RoundSummary>> {
        let mut summaries = Vec::new();
        while rounds.is_none_or(|limit| summaries.len() < limit) {
            let summary = self.play_round().await?;
            if rounds.is_some() {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    /// Releases whatever the current round still holds.
    pub fn shutdown(&mut self) {
        self.teardown_world();
        self.ctx.shared.clear_fire();
        self.publish(SessionPhase::Idle);
    }

    fn build_round(&self) -> anyhow::Result<u32> {
        let mut guard = self.ctx.shared.lock();
        let state = &mut *guard;
        if let Some(stale) = state.world.take() {
            warn!("previous world still present, releasing it");
            stale.teardown(state.sprites.as_mut());
        }
        state.session.reset_round();
        let world = World::build(
            &self.ctx.config,
            &state.session,
            state.sprites.as_mut(),
            &mut state.rng,
        )
        .context("building the round")?;
        state.world = Some(world);
        Ok(state.session.round)
    }

    /// Runs collision ticks until a terminal status is on record.
    async fn run_engine(&self) -> Result<GameStatus, EngineError> {
        let mut ticker = time::interval(self.ctx.config.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let tick = {
                let mut guard = self.ctx.shared.lock();
                let state = &mut *guard;
                collision::resolve_tick(
                    state.world.as_mut(),
                    &mut state.session,
                    &self.ctx.config,
                    state.sprites.as_mut(),
                    &mut state.rng,
                )
            };
            match tick {
                Ok(outcome) => {
                    if outcome.service_failures > 0 {
                        debug!(failures = outcome.service_failures, "sprite calls skipped");
                    }
                    if outcome.status.is_terminal() {
                        return Ok(outcome.status);
                    }
                }
                Err(err) => {
                    error!(?err, "collision engine stopped");
                    return Err(err);
                }
            }
        }
    }

    fn teardown_world(&self) {
        let mut guard = self.ctx.shared.lock();
        let state = &mut *guard;
        if let Some(world) = state.world.take() {
            world.teardown(state.sprites.as_mut());
        }
    }
}

/// Self-playing demo: the in-memory sprite service and a random pilot.
/// Stops on Ctrl-C or when the configured demo duration elapses.
pub async fn run(options: ArenaOptions) -> anyhow::Result<()> {
    let sprites = MockSpriteService::new();
    let pilot = Arc::new(DemoPilot::new(options.config.seed));
    let demo_duration = options.demo_duration;
    info!(variant = ?options.config.variant, "arena starting");
    let mut arena = Arena::new(options.config, Box::new(sprites.clone()), pilot);

    let deadline = async move {
        match demo_duration {
            Some(duration) => time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = arena.run(None) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
        _ = deadline => {
            info!("demo time elapsed");
        }
    }

    arena.shutdown();
    let session = arena.session();
    info!(
        round = session.round,
        scores = ?session.scores,
        live_sprites = sprites.live_count(),
        "arena stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapLayout;
    use crate::controller::{Buttons, ScriptedController};

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_service_fails_round_cleanly() {
        let mut config = GameConfig::asteroids();
        config.seed = Some(3);
        config.map = MapLayout::open(800.0, 600.0);
        let sprites = MockSpriteService::new();
        let pad = ScriptedController::new();
        pad.press(PlayerId::One, Buttons::START);
        let mut arena = Arena::new(config, Box::new(sprites.clone()), Arc::new(pad));

        sprites.set_capacity(Some(0));
        let err = arena.play_round().await.unwrap_err();
        assert!(format!("{err:#}").contains("start screen"), "{err:#}");
        assert_eq!(sprites.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_world() {
        let config = GameConfig::death_tanks();
        let sprites = MockSpriteService::new();
        let controller = Arc::new(ScriptedController::new());
        let mut arena = Arena::new(config, Box::new(sprites.clone()), controller);
        arena.build_round().unwrap();
        assert!(sprites.live_count() > 0);

        arena.shutdown();
        assert_eq!(sprites.live_count(), 0);
        assert_eq!(sprites.group_count(), 0);
        assert_eq!(arena.phase(), SessionPhase::Idle);
    }
}
