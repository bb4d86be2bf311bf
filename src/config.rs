use std::env;
use std::time::Duration;

const DEFAULT_WALL_BOUNCE: f32 = 5.0;

/// Which rule set the arena runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Two-player duel: walls, health bars, best-of-N rounds.
    DeathTanks,
    /// Cooperative field clearing with decomposable asteroids.
    Asteroids,
}

/// What happens when an entity leaves the playfield.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryPolicy {
    /// Toroidal wrap by the screen extent.
    Wrap,
    /// Crossing the inset boundary pushes the entity back by `bounce` and stops it dead.
    BounceAndStop { inset: f32, bounce: f32 },
    /// No boundary handling; something else (walls) removes the entity.
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WallKind {
    Border,
    Interior,
}

/// A wall given as a centre point and an extent in tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct WallSpec {
    pub image: &'static str,
    pub kind: WallKind,
    pub center: (f32, f32),
    pub width_tiles: f32,
    pub height_tiles: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapLayout {
    pub background: &'static str,
    pub tile_size: f32,
    pub walls: Vec<WallSpec>,
}

impl MapLayout {
    const TILE: f32 = 50.0;

    /// Borders only. Handy for tests that need a clear line of fire.
    pub fn open(width: f32, height: f32) -> Self {
        Self {
            background: "map.png",
            tile_size: Self::TILE,
            walls: Self::borders(width, height),
        }
    }

    pub fn death_tanks(width: f32, height: f32) -> Self {
        let tile = Self::TILE;
        let mut walls = Self::borders(width, height);
        walls.extend([
            WallSpec {
                image: "wall.bmp",
                kind: WallKind::Interior,
                center: (width / 2.0, height / 2.0),
                width_tiles: 1.0,
                height_tiles: 8.0,
            },
            WallSpec {
                image: "small_wall.bmp",
                kind: WallKind::Interior,
                center: (width - 2.5 * tile, height / 4.0),
                width_tiles: 4.0,
                height_tiles: 1.0,
            },
            WallSpec {
                image: "small_wall.bmp",
                kind: WallKind::Interior,
                center: (2.5 * tile, height - height / 4.0),
                width_tiles: 4.0,
                height_tiles: 1.0,
            },
            WallSpec {
                image: "block_wall.bmp",
                kind: WallKind::Interior,
                center: (width - 4.5 * tile, height - 1.5 * tile),
                width_tiles: 2.0,
                height_tiles: 2.0,
            },
            WallSpec {
                image: "block_wall.bmp",
                kind: WallKind::Interior,
                center: (4.5 * tile, 1.5 * tile),
                width_tiles: 2.0,
                height_tiles: 2.0,
            },
        ]);
        Self {
            background: "map.png",
            tile_size: tile,
            walls,
        }
    }

    // Half of each border sits off screen.
    fn borders(width: f32, height: f32) -> Vec<WallSpec> {
        let across = width / Self::TILE;
        let down = height / Self::TILE;
        vec![
            WallSpec {
                image: "width_wall.bmp",
                kind: WallKind::Border,
                center: (width / 2.0, 0.0),
                width_tiles: across,
                height_tiles: 1.0,
            },
            WallSpec {
                image: "width_wall.bmp",
                kind: WallKind::Border,
                center: (width / 2.0, height),
                width_tiles: across,
                height_tiles: 1.0,
            },
            WallSpec {
                image: "side_wall.bmp",
                kind: WallKind::Border,
                center: (0.0, height / 2.0),
                width_tiles: 1.0,
                height_tiles: down,
            },
            WallSpec {
                image: "side_wall.bmp",
                kind: WallKind::Border,
                center: (width, height / 2.0),
                width_tiles: 1.0,
                height_tiles: down,
            },
        ]
    }
}

/// Scripted dwell and polling intervals used by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    pub start_poll: Duration,
    pub start_blink_on: u32,
    pub start_blink_off: u32,
    pub start_ack: Duration,
    pub start_exit: Duration,
    pub loadout_poll: Duration,
    pub loadout_exit: Duration,
    pub round_banner: Duration,
    pub countdown_step: Duration,
    pub go_banner: Duration,
    pub round_end_dwell: Duration,
    pub match_end_dwell: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            start_poll: Duration::from_millis(17),
            start_blink_on: 30,
            start_blink_off: 60,
            start_ack: Duration::from_millis(250),
            start_exit: Duration::from_millis(500),
            loadout_poll: Duration::from_millis(150),
            loadout_exit: Duration::from_millis(1000),
            round_banner: Duration::from_millis(1000),
            countdown_step: Duration::from_millis(750),
            go_banner: Duration::from_millis(1000),
            round_end_dwell: Duration::from_millis(2000),
            match_end_dwell: Duration::from_millis(2000),
        }
    }
}

/// Speed and spin caps for each asteroid tier, largest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AsteroidTuning {
    pub initial_count: usize,
    pub max_tier: u8,
    pub sizes: [f32; 3],
    pub max_speed: [f32; 3],
    pub max_spin: [f32; 3],
    pub dead_zone_half: i32,
}

impl AsteroidTuning {
    fn tier_index(&self, tier: u8) -> usize {
        (self.max_tier.saturating_sub(tier) as usize).min(2)
    }

    pub fn size(&self, tier: u8) -> f32 {
        self.sizes[self.tier_index(tier)]
    }

    pub fn speed_cap(&self, tier: u8) -> f32 {
        self.max_speed[self.tier_index(tier)]
    }

    pub fn spin_cap(&self, tier: u8) -> f32 {
        self.max_spin[self.tier_index(tier)]
    }
}

impl Default for AsteroidTuning {
    fn default() -> Self {
        Self {
            initial_count: 5,
            max_tier: 3,
            sizes: [100.0, 40.0, 15.0],
            max_speed: [2.0, 2.0, 2.0],
            max_spin: [2.0, 2.0, 2.0],
            dead_zone_half: 120,
        }
    }
}

/// Every tunable the simulation consumes, gathered in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub variant: Variant,
    pub players: usize,
    pub screen_width: f32,
    pub screen_height: f32,
    pub tick_period: Duration,
    pub sampler_period: Duration,
    pub fire_poll_period: Duration,
    pub bullet_cooldown: Duration,
    /// `None` means projectiles only die by collision.
    pub bullet_ttl_ms: Option<u32>,
    pub bullet_speed: f32,
    pub bullet_size: f32,
    pub ship_size: f32,
    pub ship_accel: f32,
    /// Acceleration applied while reversing, if the variant supports it.
    pub ship_reverse_accel: Option<f32>,
    pub ship_turn_rate: i16,
    /// Cap on the *squared* speed.
    pub ship_max_speed: f32,
    pub kill_inertia_on_release: bool,
    pub ship_boundary: BoundaryPolicy,
    pub projectile_boundary: BoundaryPolicy,
    pub starting_health: i32,
    pub damage_per_hit: i32,
    pub rounds_per_match: u8,
    pub rounds_to_win: u8,
    pub loadout_choices: usize,
    pub max_projectiles_per_player: usize,
    pub max_asteroids: usize,
    pub asteroids: AsteroidTuning,
    pub map: MapLayout,
    pub timings: Timings,
    pub seed: Option<u64>,
}

impl GameConfig {
    /// Distance a ship is pushed off an interior wall. Same step as the
    /// inset boundary so the two never disagree.
    pub fn wall_bounce(&self) -> f32 {
        match self.ship_boundary {
            BoundaryPolicy::BounceAndStop { bounce, .. } => bounce,
            BoundaryPolicy::Wrap | BoundaryPolicy::Open => DEFAULT_WALL_BOUNCE,
        }
    }

    pub fn death_tanks() -> Self {
        let (width, height) = (960.0, 640.0);
        let ship_size = 60.0;
        Self {
            variant: Variant::DeathTanks,
            players: 2,
            screen_width: width,
            screen_height: height,
            tick_period: Duration::from_millis(10),
            sampler_period: Duration::from_millis(100),
            fire_poll_period: Duration::from_millis(10),
            bullet_cooldown: Duration::from_millis(1000),
            bullet_ttl_ms: None,
            bullet_speed: 8.0,
            bullet_size: 20.0,
            ship_size,
            ship_accel: 0.05,
            ship_reverse_accel: Some(-0.025),
            ship_turn_rate: 1,
            ship_max_speed: 3.0,
            kill_inertia_on_release: true,
            ship_boundary: BoundaryPolicy::BounceAndStop {
                inset: 50.0 / 2.2 + ship_size / 2.0,
                bounce: 5.0,
            },
            projectile_boundary: BoundaryPolicy::Open,
            starting_health: 100,
            damage_per_hit: 20,
            rounds_per_match: 3,
            rounds_to_win: 2,
            loadout_choices: 4,
            max_projectiles_per_player: 32,
            max_asteroids: 0,
            asteroids: AsteroidTuning {
                initial_count: 0,
                ..AsteroidTuning::default()
            },
            map: MapLayout::death_tanks(width, height),
            timings: Timings::default(),
            seed: None,
        }
    }

    pub fn asteroids() -> Self {
        let (width, height) = (800.0, 600.0);
        Self {
            variant: Variant::Asteroids,
            players: 2,
            screen_width: width,
            screen_height: height,
            tick_period: Duration::from_millis(10),
            sampler_period: Duration::from_millis(17),
            fire_poll_period: Duration::from_millis(10),
            bullet_cooldown: Duration::from_millis(500),
            bullet_ttl_ms: Some(1000),
            bullet_speed: 6.0,
            bullet_size: 26.0,
            ship_size: 50.0,
            ship_accel: 0.1,
            ship_reverse_accel: None,
            ship_turn_rate: 6,
            ship_max_speed: 8.0,
            kill_inertia_on_release: false,
            ship_boundary: BoundaryPolicy::Wrap,
            projectile_boundary: BoundaryPolicy::Wrap,
            starting_health: 100,
            damage_per_hit: 0,
            rounds_per_match: 0,
            rounds_to_win: 0,
            loadout_choices: 0,
            max_projectiles_per_player: 32,
            max_asteroids: 256,
            asteroids: AsteroidTuning::default(),
            map: MapLayout {
                background: "stars.png",
                tile_size: 50.0,
                walls: Vec::new(),
            },
            timings: Timings {
                round_end_dwell: Duration::from_millis(3000),
                ..Timings::default()
            },
            seed: None,
        }
    }

    pub fn tick_ms(&self) -> u32 {
        self.tick_period.as_millis() as u32
    }

    pub fn is_duel(&self) -> bool {
        self.variant == Variant::DeathTanks
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::death_tanks()
    }
}

/// Process-level options for the binary.
#[derive(Debug, Clone)]
pub struct ArenaOptions {
    pub config: GameConfig,
    /// How long the self-playing demo runs; `None` runs forever.
    pub demo_duration: Option<Duration>,
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self {
            config: GameConfig::death_tanks(),
            demo_duration: Some(Duration::from_secs(60)),
        }
    }
}

impl ArenaOptions {
    pub fn from_env() -> Self {
        let config = match env::var("ARENA_VARIANT").ok().as_deref() {
            Some("asteroids") => GameConfig::asteroids(),
            _ => GameConfig::death_tanks(),
        };
        let demo_duration = match env::var("ARENA_DEMO_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(Duration::from_secs(60)),
        };
        Self {
            config,
            demo_duration,
        }
    }
}
