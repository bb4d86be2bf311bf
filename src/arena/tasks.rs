use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, warn};

use super::shared::Shared;
use crate::config::GameConfig;
use crate::controller::ControllerDriver;
use crate::error::EngineError;
use crate::game::entity::PlayerId;
use crate::game::{input, physics, spawn};

/// What every periodic task needs. Cheap to clone.
#[derive(Clone)]
pub(super) struct TaskContext {
    pub shared: Arc<Shared>,
    pub config: Arc<GameConfig>,
    pub controller: Arc<dyn ControllerDriver>,
}

#[cfg(test)]
impl TaskContext {
    /// Context over a mock sprite service, with no world built yet.
    pub fn for_tests(
        config: GameConfig,
        sprites: &crate::sprite::mock::MockSpriteService,
        controller: Arc<dyn ControllerDriver>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(&config, Box::new(sprites.clone()))),
            config: Arc::new(config),
            controller,
        }
    }
}

/// The round's periodic tasks. Dropping the set aborts them.
#[derive(Default)]
pub(super) struct TaskSet {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl TaskSet {
    pub fn spawn_round(ctx: &TaskContext) -> Self {
        let mut set = Self::default();
        for &player in PlayerId::first(ctx.config.players) {
            set.push("input", InputSampler::spawn(ctx.clone(), player));
            set.push("spawner", ProjectileSpawner::spawn(ctx.clone(), player));
        }
        set.push("physics", PhysicsLoop::spawn(ctx.clone()));
        debug!(tasks = set.handles.len(), "round tasks started");
        set
    }

    fn push(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.handles.push((name, handle));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Terminates every task and waits until none of them can touch the
    /// shared state again.
    pub async fn shutdown(mut self) {
        for (name, handle) in self.handles.drain(..) {
            handle.abort();
            match handle.await {
                Ok(()) => debug!(task = name, "task had already stopped"),
                Err(err) if err.is_cancelled() => {}
                Err(err) => error!(task = name, ?err, "task panicked"),
            }
        }
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}

fn ticker(period: Duration) -> time::Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

pub(super) struct InputSampler;

impl InputSampler {
    pub fn spawn(ctx: TaskContext, player: PlayerId) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = ticker(ctx.config.sampler_period);
            loop {
                interval.tick().await;
                let buttons = ctx.controller.read_buttons(player);
                let intent = input::decode(buttons, &ctx.config);
                let mut state = ctx.shared.lock();
                let Some(ship) = state.world.as_mut().and_then(|w| w.ship_mut(player)) else {
                    continue;
                };
                input::apply(
                    intent,
                    &mut ship.body,
                    &ctx.config,
                    ctx.shared.fire_latch(player),
                );
            }
        })
    }
}

pub(super) struct ProjectileSpawner;

impl ProjectileSpawner {
    pub fn spawn(ctx: TaskContext, player: PlayerId) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if !ctx.shared.fire_pending(player) {
                    time::sleep(ctx.config.fire_poll_period).await;
                    continue;
                }
                {
                    let mut guard = ctx.shared.lock();
                    let state = &mut *guard;
                    match state.world.as_mut() {
                        Some(world) => {
                            match spawn::spawn_projectile(
                                world,
                                &ctx.config,
                                state.sprites.as_mut(),
                                player,
                            ) {
                                Ok(_) => {}
                                Err(err @ EngineError::ResourceExhausted(_)) => {
                                    warn!(?player, %err, "shot dropped");
                                }
                                Err(err) => warn!(?player, ?err, "projectile not spawned"),
                            }
                        }
                        None => debug!(?player, "fire request without a world"),
                    }
                }
                ctx.shared.take_fire(player);
                time::sleep(ctx.config.bullet_cooldown).await;
            }
        })
    }
}

pub(super) struct PhysicsLoop;

impl PhysicsLoop {
    pub fn spawn(ctx: TaskContext) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = ticker(ctx.config.tick_period);
            loop {
                interval.tick().await;
                let mut guard = ctx.shared.lock();
                let state = &mut *guard;
                match physics::step(state.world.as_mut(), &ctx.config, state.sprites.as_mut()) {
                    Ok(report) if report.expired > 0 => {
                        debug!(expired = report.expired, "projectiles aged out");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        error!(?err, "physics loop stopping");
                        break;
                    }
                }
            }
        })
    }
}
