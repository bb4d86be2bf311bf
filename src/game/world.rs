use glam::Vec2;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::{GameConfig, WallKind};
use crate::error::EngineError;
use crate::game::entity::{Entity, PlayerId, Tier, Wall};
use crate::game::images;
use crate::game::list::EntityList;
use crate::game::session::SessionState;
use crate::game::spawn;
use crate::sprite::{GroupHandle, SpriteError, SpriteHandle, SpriteService, SpriteSpec};

const HEALTH_BAR_SIZE: f32 = 150.0;
const HEALTH_BAR_DEPTH: u8 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    pub player: PlayerId,
    pub body: Entity,
    /// Single-member group other players' projectiles are tested against.
    pub group: GroupHandle,
    pub projectile_image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Groups {
    /// Every wall, borders included. Projectiles stop on any of them.
    pub obstacles: GroupHandle,
    /// Interior walls only; ships are pushed back off these.
    pub interior: GroupHandle,
    pub asteroids: GroupHandle,
}

/// Every entity and visual handle that exists for one round.
#[derive(Debug)]
pub struct World {
    pub ships: Vec<Ship>,
    pub projectiles: [EntityList<Entity>; 2],
    pub asteroids: EntityList<Entity>,
    pub walls: EntityList<Wall>,
    pub groups: Groups,
    pub background: SpriteHandle,
    pub health_bars: [Option<SpriteHandle>; 2],
    /// Handles whose delete failed. Retried every engine tick and on teardown.
    pub pending_release: Vec<SpriteHandle>,
}

impl World {
    /// Creates the round's sprites. Anything created before a failure is
    /// released again before the error is returned.
    pub fn build(
        config: &GameConfig,
        session: &SessionState,
        sprites: &mut dyn SpriteService,
        rng: &mut StdRng,
    ) -> Result<Self, EngineError> {
        let background = sprites.create(
            &SpriteSpec::new(
                config.map.background,
                config.screen_width / 2.0,
                config.screen_height / 2.0,
                config.screen_width,
                config.screen_height,
            )
            .with_depth(0),
        )?;
        let groups = match create_groups(sprites) {
            Ok(groups) => groups,
            Err(err) => {
                let _ = sprites.delete(background);
                return Err(err.into());
            }
        };

        let mut world = World {
            ships: Vec::with_capacity(config.players),
            projectiles: [
                EntityList::with_capacity(config.max_projectiles_per_player),
                EntityList::with_capacity(config.max_projectiles_per_player),
            ],
            asteroids: EntityList::with_capacity(config.max_asteroids),
            walls: EntityList::with_capacity(config.map.walls.len()),
            groups,
            background,
            health_bars: [None; 2],
            pending_release: Vec::new(),
        };
        if let Err(err) = world.populate(config, session, sprites, rng) {
            world.teardown(sprites);
            return Err(err);
        }
        debug!(
            ships = world.ships.len(),
            walls = world.walls.len(),
            asteroids = world.asteroids.len(),
            "world built"
        );
        Ok(world)
    }

    fn populate(
        &mut self,
        config: &GameConfig,
        session: &SessionState,
        sprites: &mut dyn SpriteService,
        rng: &mut StdRng,
    ) -> Result<(), EngineError> {
        for _ in 0..config.asteroids.initial_count {
            let position = spawn::initial_asteroid_position(config, rng);
            let tier = Tier(config.asteroids.max_tier);
            spawn::spawn_asteroid(self, config, sprites, rng, position, tier)?;
        }

        for &player in PlayerId::first(config.players) {
            let ship = Self::create_ship(config, session, sprites, player)?;
            self.ships.push(ship);
        }

        if config.is_duel() {
            for &player in PlayerId::first(config.players) {
                let bar = sprites.create(&health_bar_spec(config, session, player))?;
                self.health_bars[player.index()] = Some(bar);
            }
        }

        for spec in &config.map.walls {
            let size = Vec2::new(spec.width_tiles, spec.height_tiles) * config.map.tile_size;
            let center = Vec2::from(spec.center);
            let handle = sprites.create(&SpriteSpec::new(
                spec.image, center.x, center.y, size.x, size.y,
            ))?;
            let (top_left, bottom_right) = Wall::bounds(center, size);
            let wall = Wall {
                handle,
                top_left,
                bottom_right,
                border: spec.kind == WallKind::Border,
            };
            if let Err(err) = self.walls.push_front(wall) {
                let _ = sprites.delete(handle);
                return Err(err.into());
            }
            sprites.add_to_group(self.groups.obstacles, handle)?;
            if spec.kind == WallKind::Interior {
                sprites.add_to_group(self.groups.interior, handle)?;
            }
        }
        Ok(())
    }

    fn create_ship(
        config: &GameConfig,
        session: &SessionState,
        sprites: &mut dyn SpriteService,
        player: PlayerId,
    ) -> Result<Ship, EngineError> {
        let (w, h) = (config.screen_width, config.screen_height);
        let (position, heading) = match (config.is_duel(), player) {
            (true, PlayerId::One) => (Vec2::new(w / 4.0, h / 2.0), 270),
            (true, PlayerId::Two) => (Vec2::new(w - w / 4.0, h / 2.0), 90),
            (false, PlayerId::One) => (Vec2::new(w / 4.0, h / 2.0), 0),
            (false, PlayerId::Two) => (Vec2::new(w / 2.0, h / 2.0), 0),
        };
        let loadout = session.loadout[player.index()];
        let handle = sprites.create(
            &SpriteSpec::square(
                images::ship(config.is_duel(), player, loadout),
                position.x,
                position.y,
                config.ship_size,
            )
            .with_angle(f32::from(heading)),
        )?;
        let group = match sprites.create_group() {
            Ok(group) => group,
            Err(err) => {
                let _ = sprites.delete(handle);
                return Err(err.into());
            }
        };
        let ship = Ship {
            player,
            body: Entity::new(handle, position, heading),
            group,
            projectile_image: images::projectile(config.is_duel(), loadout),
        };
        if let Err(err) = sprites.add_to_group(group, handle) {
            let _ = sprites.delete(handle);
            let _ = sprites.delete_group(group);
            return Err(err.into());
        }
        Ok(ship)
    }

    pub fn ship(&self, player: PlayerId) -> Option<&Ship> {
        self.ships.iter().find(|s| s.player == player)
    }

    pub fn ship_mut(&mut self, player: PlayerId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.player == player)
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.iter().map(EntityList::len).sum()
    }

    /// Swaps the health bar for one showing the session's current index.
    /// The old bar goes first so two never overlap.
    pub fn refresh_health_bar(
        &mut self,
        config: &GameConfig,
        session: &SessionState,
        sprites: &mut dyn SpriteService,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        let slot = player.index();
        if let Some(old) = self.health_bars[slot] {
            // On failure the old bar stays tracked and no new one is created.
            sprites.delete(old)?;
            self.health_bars[slot] = None;
        }
        let bar = sprites.create(&health_bar_spec(config, session, player))?;
        self.health_bars[slot] = Some(bar);
        Ok(())
    }

    /// Retries deletes that failed earlier and returns how many still wait.
    /// A handle the service no longer knows counts as released.
    pub fn retry_releases(&mut self, sprites: &mut dyn SpriteService) -> usize {
        self.pending_release
            .retain(|&handle| match sprites.delete(handle) {
                Ok(()) | Err(SpriteError::UnknownHandle(_)) => false,
                Err(err) => {
                    debug!(%handle, ?err, "release still pending");
                    true
                }
            });
        self.pending_release.len()
    }

    /// Releases every handle and group. Service failures are logged and
    /// skipped so one bad call does not leak the rest.
    pub fn teardown(mut self, sprites: &mut dyn SpriteService) {
        let mut failures = self.retry_releases(sprites);
        let mut release = |result: Result<(), SpriteError>| {
            if let Err(err) = result {
                failures += 1;
                debug!(?err, "sprite release failed");
            }
        };

        for wall in self.walls.drain() {
            release(sprites.delete(wall.handle));
        }
        release(sprites.delete_group(self.groups.obstacles));
        release(sprites.delete_group(self.groups.interior));
        for list in self.projectiles.iter_mut() {
            for projectile in list.drain() {
                release(sprites.delete(projectile.handle));
            }
        }
        for asteroid in self.asteroids.drain() {
            release(sprites.delete(asteroid.handle));
        }
        release(sprites.delete_group(self.groups.asteroids));
        for ship in self.ships.drain(..) {
            release(sprites.delete(ship.body.handle));
            release(sprites.delete_group(ship.group));
        }
        for bar in self.health_bars.iter_mut().filter_map(Option::take) {
            release(sprites.delete(bar));
        }
        release(sprites.delete(self.background));

        if failures > 0 {
            warn!(failures, "world teardown left sprites behind");
        }
    }
}

fn create_groups(sprites: &mut dyn SpriteService) -> Result<Groups, SpriteError> {
    let mut made = Vec::with_capacity(3);
    for _ in 0..3 {
        match sprites.create_group() {
            Ok(group) => made.push(group),
            Err(err) => {
                for group in made {
                    let _ = sprites.delete_group(group);
                }
                return Err(err);
            }
        }
    }
    Ok(Groups {
        obstacles: made[0],
        interior: made[1],
        asteroids: made[2],
    })
}

fn health_bar_spec(config: &GameConfig, session: &SessionState, player: PlayerId) -> SpriteSpec {
    let x = match player {
        PlayerId::One => 20.0,
        PlayerId::Two => config.screen_width - 5.0,
    };
    let image = images::health(
        player,
        session.health_index[player.index()],
        session.max_health_index(),
    );
    SpriteSpec::square(image, x, config.screen_height / 8.0, HEALTH_BAR_SIZE)
        .with_depth(HEALTH_BAR_DEPTH)
}
