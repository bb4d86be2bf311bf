use glam::Vec2;

use crate::sprite::SpriteHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    /// Players taking part when `count` are configured.
    pub fn first(count: usize) -> &'static [PlayerId] {
        &Self::ALL[..count.min(Self::ALL.len())]
    }
}

/// Asteroid size rank. Breaking tier `n` yields fragments of tier `n - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tier(pub u8);

impl Tier {
    pub const MIN: Tier = Tier(1);

    pub fn split(self) -> Option<Tier> {
        if self > Self::MIN {
            Some(Tier(self.0 - 1))
        } else {
            None
        }
    }
}

/// Ship, projectile or asteroid.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub handle: SpriteHandle,
    pub position: Vec2,
    pub velocity: Vec2,
    pub thrust: f32,
    /// Whole degrees in `[0, 360)`. Zero points up the screen.
    pub heading: i16,
    pub turn_rate: i16,
    pub tier: Option<Tier>,
    pub age_ms: Option<u32>,
}

impl Entity {
    pub fn new(handle: SpriteHandle, position: Vec2, heading: i16) -> Self {
        Self {
            handle,
            position,
            velocity: Vec2::ZERO,
            thrust: 0.0,
            heading: normalize_heading(heading as i32),
            turn_rate: 0,
            tier: None,
            age_ms: None,
        }
    }

    /// Zeroes velocity, thrust and turn rate in one go.
    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
        self.thrust = 0.0;
        self.turn_rate = 0;
    }

    /// Unit vector along the heading, with 0° up and angles growing
    /// counter-clockwise on screen.
    pub fn facing(&self) -> Vec2 {
        facing(self.heading)
    }
}

pub fn facing(heading: i16) -> Vec2 {
    let radians = (heading as f32).to_radians();
    Vec2::new(-radians.sin(), -radians.cos())
}

pub fn normalize_heading(heading: i32) -> i16 {
    heading.rem_euclid(360) as i16
}

/// Static axis-aligned wall.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub handle: SpriteHandle,
    pub top_left: Vec2,
    pub bottom_right: Vec2,
    pub border: bool,
}

impl Wall {
    /// Inclusive-exclusive box for a wall centred at `center` measuring
    /// `size` pixels. The top-left corner sits one pixel inside.
    pub fn bounds(center: Vec2, size: Vec2) -> (Vec2, Vec2) {
        let half = size / 2.0;
        (Vec2::ONE + center - half, center + half)
    }
}
