use glam::Vec2;
use tracing::warn;

use crate::config::{BoundaryPolicy, GameConfig};
use crate::error::EngineError;
use crate::game::entity::{Entity, normalize_heading};
use crate::game::world::World;
use crate::sprite::SpriteService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    pub expired: usize,
}

/// Caps speed: when the squared speed exceeds `cap`, both components are
/// scaled by `cap / squared_speed`. The result is not a unit renormalisation.
pub fn clamp_velocity(velocity: &mut Vec2, cap: f32) {
    let squared = velocity.x * velocity.x + velocity.y * velocity.y;
    if squared > cap {
        velocity.x *= cap / squared;
        velocity.y *= cap / squared;
    }
}

/// Returns true when the bounce policy fired this tick.
pub fn apply_boundary(entity: &mut Entity, policy: BoundaryPolicy, width: f32, height: f32) -> bool {
    match policy {
        BoundaryPolicy::Open => false,
        BoundaryPolicy::Wrap => {
            entity.position.x = wrap(entity.position.x, width);
            entity.position.y = wrap(entity.position.y, height);
            false
        }
        BoundaryPolicy::BounceAndStop { inset, bounce } => {
            let mut hit = false;
            let p = &mut entity.position;
            if p.x < inset {
                p.x += bounce;
                hit = true;
            } else if p.x > width - inset {
                p.x -= bounce;
                hit = true;
            }
            if p.y < inset {
                p.y += bounce;
                hit = true;
            } else if p.y > height - inset {
                p.y -= bounce;
                hit = true;
            }
            if hit {
                entity.stop();
            }
            hit
        }
    }
}

fn wrap(value: f32, extent: f32) -> f32 {
    if value < 0.0 {
        value + extent
    } else if value > extent {
        value - extent
    } else {
        value
    }
}

pub fn advance_ship(ship: &mut Entity, config: &GameConfig) {
    ship.heading = normalize_heading(i32::from(ship.heading) + i32::from(ship.turn_rate));
    let push = ship.facing() * ship.thrust;
    ship.velocity += push;
    clamp_velocity(&mut ship.velocity, config.ship_max_speed);
    ship.position += ship.velocity;
    apply_boundary(
        ship,
        config.ship_boundary,
        config.screen_width,
        config.screen_height,
    );
}

/// One fixed simulation tick: ships, then projectiles (ageing out expired
/// ones), then asteroids.
pub fn step(
    world: Option<&mut World>,
    config: &GameConfig,
    sprites: &mut dyn SpriteService,
) -> Result<StepReport, EngineError> {
    let world = world.ok_or(EngineError::InvalidState("physics tick before world init"))?;
    let mut report = StepReport::default();

    for ship in world.ships.iter_mut() {
        advance_ship(&mut ship.body, config);
    }

    let tick_ms = config.tick_ms();
    for list in world.projectiles.iter_mut() {
        let mut cursor = list.cursor_mut();
        while let Some(projectile) = cursor.current() {
            let expired = match (projectile.age_ms.as_mut(), config.bullet_ttl_ms) {
                (Some(age), Some(ttl)) => {
                    *age += tick_ms;
                    *age >= ttl
                }
                _ => false,
            };
            if expired {
                if let Some(gone) = cursor.remove_current() {
                    if let Err(err) = sprites.delete(gone.handle) {
                        warn!(?err, handle = %gone.handle, "expired projectile sprite not released");
                        world.pending_release.push(gone.handle);
                    }
                    report.expired += 1;
                }
                continue;
            }
            projectile.position += projectile.velocity;
            apply_boundary(
                projectile,
                config.projectile_boundary,
                config.screen_width,
                config.screen_height,
            );
            cursor.advance();
        }
    }

    world.asteroids.for_each_mut(|asteroid| {
        asteroid.position += asteroid.velocity;
        asteroid.position.x = wrap(asteroid.position.x, config.screen_width);
        asteroid.position.y = wrap(asteroid.position.y, config.screen_height);
        asteroid.heading =
            normalize_heading(i32::from(asteroid.heading) + i32::from(asteroid.turn_rate));
    });

    Ok(report)
}
