//! Per-tick collision queries and the game rules they trigger.
//!
//! Runs after physics for the same tick, under the same lock. Sprite
//! positions are pushed to the service first so every query sees the
//! freshly integrated state.

use glam::Vec2;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::EngineError;
use crate::game::entity::{Entity, PlayerId, Tier, Wall};
use crate::game::session::{GameStatus, SessionState};
use crate::game::spawn;
use crate::game::world::World;
use crate::sprite::{GroupHandle, SpriteError, SpriteHandle, SpriteService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub shooter: PlayerId,
    pub victim: PlayerId,
    pub health: i32,
    pub display_index: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    pub hits: Vec<Hit>,
    pub wall_stops: usize,
    pub projectiles_blocked: usize,
    pub asteroids_destroyed: usize,
    pub fragments_spawned: usize,
    /// Sprite calls that failed and were skipped this tick.
    pub service_failures: usize,
    pub status: GameStatus,
    /// The terminal status was recorded during this tick.
    pub ended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Ship(PlayerId),
    Obstacles,
    Asteroids,
}

/// Nearest-edge push-back for a ship touching a wall, followed by a full stop.
pub fn push_out_of_wall(ship: &mut Entity, wall: &Wall, bounce: f32) {
    let (tl, br) = (wall.top_left, wall.bottom_right);
    let p = &mut ship.position;
    if p.x > tl.x && p.x < br.x {
        if (p.y - tl.y).abs() < (p.y - br.y).abs() {
            p.y -= bounce;
        } else {
            p.y += bounce;
        }
    }
    if p.y > tl.y && p.y < br.y {
        if (p.x - tl.x).abs() < (p.x - br.x).abs() {
            p.x -= bounce;
        } else {
            p.x += bounce;
        }
    }
    ship.stop();
}

struct Pass<'a> {
    sprites: &'a mut dyn SpriteService,
    outcome: TickOutcome,
    /// Handles still waiting for a successful delete.
    pending: Vec<SpriteHandle>,
}

impl Pass<'_> {
    fn note(&mut self, result: Result<(), SpriteError>) {
        if let Err(err) = result {
            self.outcome.service_failures += 1;
            debug!(?err, "sprite call skipped");
        }
    }

    fn sync(&mut self, entity: &Entity, rotate: bool) {
        if rotate {
            let result = self.sprites.set_rotation(entity.handle, f32::from(entity.heading));
            self.note(result);
        }
        let result = self
            .sprites
            .set_position(entity.handle, entity.position.x, entity.position.y);
        self.note(result);
    }

    /// A failed query counts as a miss, and so does a hit on a sprite whose
    /// entity is already gone.
    fn first_hit(&mut self, handle: SpriteHandle, group: GroupHandle) -> Option<SpriteHandle> {
        match self.sprites.test_collision(handle, group, 1) {
            Ok(hits) if hits.is_hit() => hits.first.filter(|h| !self.pending.contains(h)),
            Ok(_) => None,
            Err(err) => {
                self.outcome.service_failures += 1;
                debug!(?err, "collision query skipped");
                None
            }
        }
    }

    /// Deletes a sprite, keeping the handle for a later retry on failure.
    fn release(&mut self, handle: SpriteHandle) {
        if let Err(err) = self.sprites.delete(handle) {
            self.outcome.service_failures += 1;
            debug!(%handle, ?err, "release deferred");
            self.pending.push(handle);
        }
    }
}

/// One engine tick: sprite sync, wall stops, projectile hits, asteroid
/// break-up and terminal-condition checks.
pub fn resolve_tick(
    world: Option<&mut World>,
    session: &mut SessionState,
    config: &GameConfig,
    sprites: &mut dyn SpriteService,
    rng: &mut StdRng,
) -> Result<TickOutcome, EngineError> {
    let world = world.ok_or(EngineError::InvalidState("engine tick before world init"))?;
    world.retry_releases(sprites);
    let mut pass = Pass {
        sprites,
        outcome: TickOutcome::default(),
        pending: std::mem::take(&mut world.pending_release),
    };

    resolve_ships(world, config, &mut pass);
    let fragments = resolve_projectiles(world, session, config, &mut pass);

    for (position, tier) in fragments {
        pass.outcome.fragments_spawned +=
            spawn::spawn_fragments(world, config, pass.sprites, rng, position, tier);
    }
    for asteroid in world.asteroids.values() {
        pass.sync(asteroid, true);
    }

    if !config.is_duel() {
        let status = if world.asteroids.is_empty() {
            Some(GameStatus::FieldCleared)
        } else {
            let group = world.groups.asteroids;
            world
                .ships
                .iter()
                .any(|ship| pass.first_hit(ship.body.handle, group).is_some())
                .then_some(GameStatus::ShipDestroyed)
        };
        if let Some(status) = status {
            if session.record(status) {
                pass.outcome.ended = true;
                info!(?status, round = session.round, "round over");
            }
        }
    }

    world.pending_release = pass.pending;
    let mut outcome = pass.outcome;
    outcome.status = session.status;
    Ok(outcome)
}

fn resolve_ships(world: &mut World, config: &GameConfig, pass: &mut Pass<'_>) {
    let World {
        ships,
        walls,
        groups,
        ..
    } = world;
    for ship in ships.iter_mut() {
        pass.sync(&ship.body, true);
        // Borders are left out; the inset boundary keeps ships in.
        let Some(hit) = pass.first_hit(ship.body.handle, groups.interior) else {
            continue;
        };
        let Some(wall) = walls.values().find(|w| w.handle == hit) else {
            continue;
        };
        push_out_of_wall(&mut ship.body, wall, config.wall_bounce());
        pass.outcome.wall_stops += 1;
        debug!(player = ?ship.player, x = ship.body.position.x, y = ship.body.position.y, "ship stopped by wall");
        pass.sync(&ship.body, false);
    }
}

/// Walks every projectile list with first-match-wins targeting. Returns the
/// asteroids that broke and still need fragments.
fn resolve_projectiles(
    world: &mut World,
    session: &mut SessionState,
    config: &GameConfig,
    pass: &mut Pass<'_>,
) -> Vec<(Vec2, Tier)> {
    let mut broken = Vec::new();
    for &shooter in PlayerId::first(config.players) {
        let targets = if config.is_duel() {
            [Target::Ship(shooter.opponent()), Target::Obstacles]
        } else {
            [Target::Asteroids, Target::Obstacles]
        };

        let World {
            ships,
            projectiles,
            asteroids,
            groups,
            ..
        } = &mut *world;
        let mut cursor = projectiles[shooter.index()].cursor_mut();
        let mut victims = Vec::new();

        while let Some(projectile) = cursor.current() {
            pass.sync(projectile, false);
            let handle = projectile.handle;

            let mut struck = None;
            for target in targets {
                let group = match target {
                    Target::Ship(victim) => match ships.iter().find(|s| s.player == victim) {
                        Some(ship) => ship.group,
                        None => continue,
                    },
                    Target::Obstacles => groups.obstacles,
                    Target::Asteroids => groups.asteroids,
                };
                if let Some(hit) = pass.first_hit(handle, group) {
                    struck = Some((target, hit));
                    break;
                }
            }

            let Some((target, hit)) = struck else {
                cursor.advance();
                continue;
            };
            pass.release(handle);
            cursor.remove_current();

            match target {
                Target::Ship(victim) => victims.push(victim),
                Target::Obstacles => pass.outcome.projectiles_blocked += 1,
                Target::Asteroids => {
                    let Some(id) = asteroids.find(|a| a.handle == hit) else {
                        continue;
                    };
                    if let Some(rock) = asteroids.remove(id) {
                        pass.release(rock.handle);
                        pass.outcome.asteroids_destroyed += 1;
                        broken.push((rock.position, rock.tier.unwrap_or(Tier::MIN)));
                    }
                }
            }
        }

        for victim in victims {
            register_hit(world, session, config, pass, shooter, victim);
        }
    }
    broken
}

fn register_hit(
    world: &mut World,
    session: &mut SessionState,
    config: &GameConfig,
    pass: &mut Pass<'_>,
    shooter: PlayerId,
    victim: PlayerId,
) {
    let hit = session.apply_hit(victim, config.damage_per_hit);
    pass.outcome.hits.push(Hit {
        shooter,
        victim,
        health: hit.health,
        display_index: hit.display_index,
    });
    info!(?shooter, ?victim, health = hit.health, "ship hit");

    if let Err(err) = world.refresh_health_bar(config, session, pass.sprites, victim) {
        pass.outcome.service_failures += 1;
        warn!(?err, player = ?victim, "health bar not refreshed");
    }

    if hit.knocked_out && session.record(GameStatus::win_for(shooter)) {
        pass.outcome.ended = true;
        info!(winner = ?shooter, round = session.round, "round won");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::list::SlotId;
    use crate::game::spawn::{spawn_asteroid, spawn_projectile};
    use crate::sprite::mock::MockSpriteService;
    use rand::SeedableRng;

    struct Harness {
        config: GameConfig,
        session: SessionState,
        sprites: MockSpriteService,
        rng: StdRng,
        world: World,
    }

    impl Harness {
        fn new(mut config: GameConfig) -> Self {
            config.asteroids.initial_count = 0;
            let session = SessionState::new(&config);
            let mut sprites = MockSpriteService::new();
            let mut rng = StdRng::seed_from_u64(21);
            let world = World::build(&config, &session, &mut sprites, &mut rng).unwrap();
            Self {
                config,
                session,
                sprites,
                rng,
                world,
            }
        }

        fn tick(&mut self) -> TickOutcome {
            resolve_tick(
                Some(&mut self.world),
                &mut self.session,
                &self.config,
                &mut self.sprites,
                &mut self.rng,
            )
            .unwrap()
        }

        fn fire_at(&mut self, shooter: PlayerId, at: Vec2) -> SlotId {
            let id = spawn_projectile(&mut self.world, &self.config, &mut self.sprites, shooter)
                .unwrap();
            self.world.projectiles[shooter.index()]
                .get_mut(id)
                .unwrap()
                .position = at;
            id
        }

        fn place_ship(&mut self, player: PlayerId, at: Vec2) {
            self.world.ship_mut(player).unwrap().body.position = at;
        }

        fn ship_position(&self, player: PlayerId) -> Vec2 {
            self.world.ship(player).unwrap().body.position
        }
    }

    #[test]
    fn test_ship_pushed_off_nearest_wall_edge() {
        let mut h = Harness::new(GameConfig::death_tanks());
        h.place_ship(PlayerId::One, Vec2::new(430.0, 320.0));
        h.world.ship_mut(PlayerId::One).unwrap().body.velocity = Vec2::new(1.0, 0.0);

        let outcome = h.tick();
        assert_eq!(outcome.wall_stops, 1);
        assert_eq!(h.ship_position(PlayerId::One), Vec2::new(425.0, 320.0));
        let body = &h.world.ship(PlayerId::One).unwrap().body;
        assert_eq!(body.velocity, Vec2::ZERO);
        assert_eq!(body.thrust, 0.0);
    }

    #[test]
    fn test_interior_wall_found_while_touching_border() {
        let mut h = Harness::new(GameConfig::death_tanks());
        // Overlaps the left border and the small wall at (125, 480).
        h.place_ship(PlayerId::One, Vec2::new(54.0, 480.0));

        let outcome = h.tick();
        assert_eq!(outcome.wall_stops, 1, "interior wall still resolved");
        assert_eq!(h.ship_position(PlayerId::One), Vec2::new(49.0, 475.0));
    }

    #[test]
    fn test_projectile_damages_opponent() {
        let mut h = Harness::new(GameConfig::death_tanks());
        let target = h.ship_position(PlayerId::Two);
        let id = h.fire_at(PlayerId::One, target);

        let outcome = h.tick();
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].victim, PlayerId::Two);
        assert_eq!(h.session.health, [100, 80]);
        assert!(!h.world.projectiles[0].contains(id));
        assert_eq!(h.sprites.count_image("p2_health4.png"), 1);
        assert_eq!(h.sprites.count_image("p2_health5.png"), 0, "old bar released");
        assert_eq!(outcome.status, GameStatus::InPlay);
    }

    #[test]
    fn test_projectile_ignores_own_ship() {
        let mut h = Harness::new(GameConfig::death_tanks());
        let own = h.ship_position(PlayerId::One);
        let id = h.fire_at(PlayerId::One, own);
        let outcome = h.tick();
        assert!(outcome.hits.is_empty());
        assert!(h.world.projectiles[0].contains(id));
    }

    #[test]
    fn test_simultaneous_hits_record_win_once() {
        let mut h = Harness::new(GameConfig::death_tanks());
        let target = h.ship_position(PlayerId::One);
        for _ in 0..6 {
            h.fire_at(PlayerId::Two, target);
        }

        let outcome = h.tick();
        assert_eq!(outcome.hits.len(), 6, "every projectile counts once");
        assert!(outcome.ended);
        assert_eq!(outcome.status, GameStatus::PlayerTwoWin);
        assert_eq!(h.session.health[0], -20);
        assert_eq!(h.session.health_index[0], 5);

        let next = h.tick();
        assert!(!next.ended, "win is not recorded twice");
        assert_eq!(next.status, GameStatus::PlayerTwoWin);
    }

    #[test]
    fn test_ship_hit_takes_priority_over_wall() {
        let mut h = Harness::new(GameConfig::death_tanks());
        h.place_ship(PlayerId::Two, Vec2::new(530.0, 320.0));
        h.fire_at(PlayerId::One, Vec2::new(505.0, 320.0));

        let outcome = h.tick();
        assert_eq!(h.ship_position(PlayerId::Two), Vec2::new(535.0, 320.0));
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.projectiles_blocked, 0);
    }

    #[test]
    fn test_wall_absorbs_projectile() {
        let mut h = Harness::new(GameConfig::death_tanks());
        let id = h.fire_at(PlayerId::One, Vec2::new(480.0, 200.0));
        let outcome = h.tick();
        assert_eq!(outcome.projectiles_blocked, 1);
        assert!(outcome.hits.is_empty());
        assert!(!h.world.projectiles[0].contains(id));
        assert_eq!(h.session.health, [100, 100]);
    }

    #[test]
    fn test_asteroid_breaks_into_fragments() {
        let mut h = Harness::new(GameConfig::asteroids());
        let at = Vec2::new(600.0, 100.0);
        spawn_asteroid(
            &mut h.world,
            &h.config,
            &mut h.sprites,
            &mut h.rng,
            at,
            Tier(3),
        )
        .unwrap();
        h.fire_at(PlayerId::Two, at);

        let outcome = h.tick();
        assert_eq!(outcome.asteroids_destroyed, 1);
        assert_eq!(outcome.fragments_spawned, 3);
        assert_eq!(h.world.asteroids.len(), 3);
        assert!(h.world.asteroids.values().all(|a| a.tier == Some(Tier(2))));
        assert_eq!(h.sprites.count_image("a3.png"), 0);
        assert_eq!(outcome.status, GameStatus::InPlay);
    }

    #[test]
    fn test_last_asteroid_clears_field() {
        let mut h = Harness::new(GameConfig::asteroids());
        let at = Vec2::new(600.0, 100.0);
        spawn_asteroid(
            &mut h.world,
            &h.config,
            &mut h.sprites,
            &mut h.rng,
            at,
            Tier::MIN,
        )
        .unwrap();
        h.fire_at(PlayerId::One, at);

        let outcome = h.tick();
        assert_eq!(outcome.fragments_spawned, 0);
        assert!(outcome.ended);
        assert_eq!(outcome.status, GameStatus::FieldCleared);
    }

    #[test]
    fn test_ship_touching_asteroid_is_destroyed() {
        let mut h = Harness::new(GameConfig::asteroids());
        let at = h.ship_position(PlayerId::Two);
        spawn_asteroid(
            &mut h.world,
            &h.config,
            &mut h.sprites,
            &mut h.rng,
            at,
            Tier(2),
        )
        .unwrap();
        let outcome = h.tick();
        assert_eq!(outcome.status, GameStatus::ShipDestroyed);
    }

    #[test]
    fn test_unavailable_service_keeps_state() {
        let mut h = Harness::new(GameConfig::death_tanks());
        let target = h.ship_position(PlayerId::Two);
        let id = h.fire_at(PlayerId::One, target);
        h.sprites.set_unavailable(true);

        let outcome = h.tick();
        assert!(outcome.service_failures > 0);
        assert!(outcome.hits.is_empty(), "failed queries count as misses");
        assert!(h.world.projectiles[0].contains(id));

        h.sprites.set_unavailable(false);
        let retried = h.tick();
        assert_eq!(retried.hits.len(), 1, "retried next tick");
    }

    #[test]
    fn test_failed_release_retried_next_tick() {
        let mut h = Harness::new(GameConfig::asteroids());
        let at = Vec2::new(600.0, 100.0);
        spawn_asteroid(
            &mut h.world,
            &h.config,
            &mut h.sprites,
            &mut h.rng,
            at,
            Tier(2),
        )
        .unwrap();
        h.fire_at(PlayerId::One, at);
        h.sprites.set_failing_deletes(true);

        let outcome = h.tick();
        assert_eq!(outcome.asteroids_destroyed, 1);
        assert_eq!(outcome.fragments_spawned, 3);
        assert_eq!(outcome.service_failures, 2);
        assert_eq!(h.world.pending_release.len(), 2, "bullet and rock kept");
        assert_eq!(h.sprites.count_image("a2.png"), 1);

        let still = h.tick();
        assert_eq!(still.status, GameStatus::InPlay, "leftover rock is inert");
        assert_eq!(h.world.pending_release.len(), 2);

        h.sprites.set_failing_deletes(false);
        h.tick();
        assert!(h.world.pending_release.is_empty());
        assert_eq!(h.sprites.count_image("a2.png"), 0);
        assert_eq!(h.sprites.count_image("bullet.png"), 0);

        h.world.teardown(&mut h.sprites);
        assert_eq!(h.sprites.live_count(), 0);
    }

    #[test]
    fn test_engine_without_world_is_invalid() {
        let config = GameConfig::death_tanks();
        let mut session = SessionState::new(&config);
        let mut sprites = MockSpriteService::new();
        let mut rng = StdRng::seed_from_u64(0);
        let err = resolve_tick(None, &mut session, &config, &mut sprites, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }
}
