use glam::Vec2;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::GameConfig;
use crate::controller::Buttons;
use crate::game::entity::Entity;

/// Control intent decoded from one button sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlIntent {
    pub turn_rate: i16,
    pub thrust: f32,
    /// No thrust button held.
    pub coasting: bool,
    pub fire: bool,
}

pub fn decode(buttons: Buttons, config: &GameConfig) -> ControlIntent {
    let left = buttons.contains(Buttons::LEFT);
    let right = buttons.contains(Buttons::RIGHT);
    let turn_rate = match (left, right) {
        (true, false) => config.ship_turn_rate,
        (false, true) => -config.ship_turn_rate,
        _ => 0,
    };

    let reverse = config
        .ship_reverse_accel
        .filter(|_| buttons.contains(Buttons::A));
    let (thrust, coasting) = if buttons.contains(Buttons::B) {
        (config.ship_accel, false)
    } else if let Some(accel) = reverse {
        (accel, false)
    } else {
        (0.0, true)
    };

    ControlIntent {
        turn_rate,
        thrust,
        coasting,
        fire: buttons.contains(Buttons::Y),
    }
}

/// Writes an intent onto the ship. The fire latch is only ever set here;
/// clearing it belongs to the projectile spawner.
pub fn apply(intent: ControlIntent, ship: &mut Entity, config: &GameConfig, fire: &AtomicBool) {
    ship.turn_rate = intent.turn_rate;
    ship.thrust = intent.thrust;
    if intent.coasting && config.kill_inertia_on_release {
        ship.velocity = Vec2::ZERO;
    }
    if intent.fire {
        fire.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::SpriteHandle;

    fn ship() -> Entity {
        let mut ship = Entity::new(SpriteHandle(1), Vec2::new(100.0, 100.0), 0);
        ship.velocity = Vec2::new(1.0, 1.0);
        ship
    }

    #[test]
    fn test_left_and_right_cancel() {
        let config = GameConfig::death_tanks();
        assert_eq!(decode(Buttons::LEFT, &config).turn_rate, 1);
        assert_eq!(decode(Buttons::RIGHT, &config).turn_rate, -1);
        assert_eq!(decode(Buttons::LEFT | Buttons::RIGHT, &config).turn_rate, 0);
        assert_eq!(decode(Buttons::NONE, &config).turn_rate, 0);
    }

    #[test]
    fn test_reverse_only_where_configured() {
        let tanks = GameConfig::death_tanks();
        let intent = decode(Buttons::A, &tanks);
        assert_eq!(intent.thrust, -0.025);
        assert!(!intent.coasting);
        assert_eq!(decode(Buttons::A | Buttons::B, &tanks).thrust, 0.05, "forward wins");

        let rocks = GameConfig::asteroids();
        assert!(decode(Buttons::A, &rocks).coasting);
    }

    #[test]
    fn test_release_kills_inertia_in_duel() {
        let config = GameConfig::death_tanks();
        let fire = AtomicBool::new(false);
        let mut tank = ship();
        apply(decode(Buttons::NONE, &config), &mut tank, &config, &fire);
        assert_eq!(tank.velocity, Vec2::ZERO);

        let config = GameConfig::asteroids();
        let mut drifting = ship();
        apply(decode(Buttons::NONE, &config), &mut drifting, &config, &fire);
        assert_eq!(drifting.velocity, Vec2::new(1.0, 1.0), "asteroid ships keep drifting");
    }

    #[test]
    fn test_fire_latch_is_sticky() {
        let config = GameConfig::death_tanks();
        let fire = AtomicBool::new(false);
        let mut tank = ship();
        apply(decode(Buttons::Y, &config), &mut tank, &config, &fire);
        apply(decode(Buttons::NONE, &config), &mut tank, &config, &fire);
        assert!(fire.load(Ordering::Acquire), "release does not clear a pending shot");
    }
}
