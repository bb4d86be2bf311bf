use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::warn;

use crate::config::GameConfig;
use crate::error::EngineError;
use crate::game::entity::PlayerId;
use crate::game::session::SessionState;
use crate::game::world::World;
use crate::sprite::{SpriteHandle, SpriteService, SpriteSpec};

/// Everything the periodic tasks touch, guarded by one lock.
pub struct ArenaState {
    pub world: Option<World>,
    pub session: SessionState,
    pub sprites: Box<dyn SpriteService>,
    pub rng: StdRng,
}

/// Shared-state mutex plus the per-player fire latches, which live outside
/// the lock so the sampler can raise them without contention.
pub struct Shared {
    state: Mutex<ArenaState>,
    fire: [AtomicBool; 2],
}

impl Shared {
    pub fn new(config: &GameConfig, sprites: Box<dyn SpriteService>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: Mutex::new(ArenaState {
                world: None,
                session: SessionState::new(config),
                sprites,
                rng,
            }),
            fire: [AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    /// Blocks until the shared state is free. Never hold the guard across
    /// an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, ArenaState> {
        self.state.lock()
    }

    /// Creates a presentation sprite under the lock.
    pub fn show(&self, spec: &SpriteSpec) -> Result<SpriteHandle, EngineError> {
        let mut state = self.lock();
        Ok(state.sprites.create(spec)?)
    }

    /// Deletes a presentation sprite. Failures are logged, not returned.
    pub fn release(&self, handle: SpriteHandle) {
        let mut state = self.lock();
        if let Err(err) = state.sprites.delete(handle) {
            warn!(%handle, ?err, "sprite not released");
        }
    }

    pub fn fire_latch(&self, player: PlayerId) -> &AtomicBool {
        &self.fire[player.index()]
    }

    /// Takes a pending fire request, if any.
    pub fn take_fire(&self, player: PlayerId) -> bool {
        self.fire[player.index()].swap(false, Ordering::AcqRel)
    }

    pub fn fire_pending(&self, player: PlayerId) -> bool {
        self.fire[player.index()].load(Ordering::Acquire)
    }

    pub fn clear_fire(&self) {
        for latch in &self.fire {
            latch.store(false, Ordering::Release);
        }
    }
}
