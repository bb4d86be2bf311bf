use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::error::EngineError;
use crate::game::entity::{Entity, PlayerId, Tier};
use crate::game::images;
use crate::game::list::SlotId;
use crate::game::world::World;
use crate::sprite::{SpriteService, SpriteSpec};

/// Fragments produced when an asteroid above the minimum tier breaks.
pub const FRAGMENTS_PER_SPLIT: usize = 3;

/// Puts a projectile at the firing ship's position, moving along its
/// heading, at the head of that player's list.
pub fn spawn_projectile(
    world: &mut World,
    config: &GameConfig,
    sprites: &mut dyn SpriteService,
    player: PlayerId,
) -> Result<SlotId, EngineError> {
    let ship = world
        .ship(player)
        .ok_or(EngineError::InvalidState("firing ship does not exist"))?;
    let list = &world.projectiles[player.index()];
    if list.is_full() {
        return Err(EngineError::ResourceExhausted("projectile list at capacity"));
    }

    let position = ship.body.position;
    let heading = ship.body.heading;
    let handle = sprites.create(
        &SpriteSpec::square(
            ship.projectile_image.clone(),
            position.x,
            position.y,
            config.bullet_size,
        )
        .with_angle(f32::from(heading)),
    )?;

    let mut projectile = Entity::new(handle, position, heading);
    projectile.velocity = projectile.facing() * config.bullet_speed;
    projectile.age_ms = config.bullet_ttl_ms.map(|_| 0);

    match world.projectiles[player.index()].push_front(projectile) {
        Ok(id) => {
            debug!(?player, heading, "projectile spawned");
            Ok(id)
        }
        Err(err) => {
            let _ = sprites.delete(handle);
            Err(err.into())
        }
    }
}

/// One random velocity or spin component: `(r % ⌊cap·10⌋) / 5 − cap`.
pub fn random_component(rng: &mut StdRng, cap: f32) -> f32 {
    let span = (cap * 10.0) as i32;
    if span <= 0 {
        return 0.0;
    }
    rng.gen_range(0..span) as f32 / 5.0 - cap
}

/// A starting point outside the dead zone around the screen centre.
pub fn initial_asteroid_position(config: &GameConfig, rng: &mut StdRng) -> Vec2 {
    let dead = config.asteroids.dead_zone_half;
    let mut axis = |half: i32| {
        let near = rng.gen_range(0..(half - dead).max(1));
        let far_side = rng.gen_range(0..2) * (half + dead);
        (near + far_side) as f32
    };
    let x = axis((config.screen_width / 2.0) as i32);
    let y = axis((config.screen_height / 2.0) as i32);
    Vec2::new(x, y)
}

pub fn spawn_asteroid(
    world: &mut World,
    config: &GameConfig,
    sprites: &mut dyn SpriteService,
    rng: &mut StdRng,
    position: Vec2,
    tier: Tier,
) -> Result<SlotId, EngineError> {
    if world.asteroids.is_full() {
        return Err(EngineError::ResourceExhausted("asteroid list at capacity"));
    }
    let tuning = &config.asteroids;
    let speed = tuning.speed_cap(tier.0);
    let velocity = Vec2::new(random_component(rng, speed), random_component(rng, speed));
    let heading = rng.gen_range(0..360);
    let turn_rate = random_component(rng, tuning.spin_cap(tier.0)) as i16;

    let handle = sprites.create(
        &SpriteSpec::square(
            images::asteroid(tier.0),
            position.x,
            position.y,
            tuning.size(tier.0),
        )
        .with_angle(f32::from(heading)),
    )?;
    if let Err(err) = sprites.add_to_group(world.groups.asteroids, handle) {
        let _ = sprites.delete(handle);
        return Err(err.into());
    }

    let mut asteroid = Entity::new(handle, position, heading);
    asteroid.velocity = velocity;
    asteroid.turn_rate = turn_rate;
    asteroid.tier = Some(tier);
    match world.asteroids.push_front(asteroid) {
        Ok(id) => Ok(id),
        Err(err) => {
            let _ = sprites.delete(handle);
            Err(err.into())
        }
    }
}

/// Replaces a destroyed asteroid with three of the next tier down at the
/// same spot. Minimum-tier asteroids leave nothing behind. Returns how many
/// fragments were actually placed.
pub fn spawn_fragments(
    world: &mut World,
    config: &GameConfig,
    sprites: &mut dyn SpriteService,
    rng: &mut StdRng,
    position: Vec2,
    tier: Tier,
) -> usize {
    let Some(child) = tier.split() else {
        return 0;
    };
    let mut placed = 0;
    for _ in 0..FRAGMENTS_PER_SPLIT {
        match spawn_asteroid(world, config, sprites, rng, position, child) {
            Ok(_) => placed += 1,
            Err(err) => {
                warn!(?err, tier = child.0, "dropping asteroid fragment");
                break;
            }
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::SessionState;
    use crate::sprite::mock::MockSpriteService;
    use rand::SeedableRng;

    fn asteroid_world() -> (World, GameConfig, MockSpriteService, StdRng) {
        let mut config = GameConfig::asteroids();
        config.asteroids.initial_count = 0;
        let session = SessionState::new(&config);
        let mut sprites = MockSpriteService::new();
        let mut rng = StdRng::seed_from_u64(3);
        let world = World::build(&config, &session, &mut sprites, &mut rng).unwrap();
        (world, config, sprites, rng)
    }

    #[test]
    fn test_projectile_leaves_along_heading() {
        let config = GameConfig::death_tanks();
        let session = SessionState::new(&config);
        let mut sprites = MockSpriteService::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut world = World::build(&config, &session, &mut sprites, &mut rng).unwrap();

        let id = spawn_projectile(&mut world, &config, &mut sprites, PlayerId::One).unwrap();
        let projectile = world.projectiles[0].get(id).unwrap();
        assert_eq!(projectile.position, Vec2::new(240.0, 320.0));
        assert!((projectile.velocity.x - 8.0).abs() < 1e-4, "heading 270 fires right");
        assert!(projectile.velocity.y.abs() < 1e-4);
        assert_eq!(projectile.age_ms, None, "duel projectiles never age");
        assert_eq!(sprites.count_image("bullet0.png"), 1);
    }

    #[test]
    fn test_projectile_rejected_at_capacity() {
        let mut config = GameConfig::death_tanks();
        config.max_projectiles_per_player = 1;
        let session = SessionState::new(&config);
        let mut sprites = MockSpriteService::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut world = World::build(&config, &session, &mut sprites, &mut rng).unwrap();

        spawn_projectile(&mut world, &config, &mut sprites, PlayerId::Two).unwrap();
        let live = sprites.live_count();
        let err = spawn_projectile(&mut world, &config, &mut sprites, PlayerId::Two).unwrap_err();
        assert!(matches!(err, EngineError::ResourceExhausted(_)));
        assert_eq!(world.projectiles[1].len(), 1);
        assert_eq!(sprites.live_count(), live, "no handle leaked");
    }

    #[test]
    fn test_tier_three_splits_into_three_tier_twos() {
        let (mut world, config, mut sprites, mut rng) = asteroid_world();
        let at = Vec2::new(100.0, 80.0);
        let placed = spawn_fragments(&mut world, &config, &mut sprites, &mut rng, at, Tier(3));
        assert_eq!(placed, 3);
        assert_eq!(world.asteroids.len(), 3);
        for fragment in world.asteroids.values() {
            assert_eq!(fragment.tier, Some(Tier(2)));
            assert_eq!(fragment.position, at);
            assert!(fragment.velocity.x.abs() <= 2.0 && fragment.velocity.y.abs() <= 2.0);
        }
        assert_eq!(sprites.count_image("a2.png"), 3);
    }

    #[test]
    fn test_tier_one_leaves_nothing() {
        let (mut world, config, mut sprites, mut rng) = asteroid_world();
        let placed = spawn_fragments(
            &mut world,
            &config,
            &mut sprites,
            &mut rng,
            Vec2::ZERO,
            Tier::MIN,
        );
        assert_eq!(placed, 0);
        assert!(world.asteroids.is_empty());
    }

    #[test]
    fn test_random_component_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let v = random_component(&mut rng, 2.0);
            assert!((-2.0..2.0).contains(&v), "{v} out of range");
        }
        assert_eq!(random_component(&mut rng, 0.0), 0.0);
    }

    #[test]
    fn test_initial_positions_avoid_centre() {
        let config = GameConfig::asteroids();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let p = initial_asteroid_position(&config, &mut rng);
            let near_x = (p.x - 400.0).abs() < 120.0;
            let near_y = (p.y - 300.0).abs() < 120.0;
            assert!(!(near_x || near_y), "{p} inside dead zone");
        }
    }
}
