use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::game::entity::PlayerId;

/// Active-high button mask as read from an SNES pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons(pub u16);

impl Buttons {
    pub const R: Buttons = Buttons(1 << 0);
    pub const L: Buttons = Buttons(1 << 1);
    pub const X: Buttons = Buttons(1 << 2);
    pub const A: Buttons = Buttons(1 << 3);
    pub const RIGHT: Buttons = Buttons(1 << 4);
    pub const LEFT: Buttons = Buttons(1 << 5);
    pub const DOWN: Buttons = Buttons(1 << 6);
    pub const UP: Buttons = Buttons(1 << 7);
    pub const START: Buttons = Buttons(1 << 8);
    pub const SELECT: Buttons = Buttons(1 << 9);
    pub const Y: Buttons = Buttons(1 << 10);
    pub const B: Buttons = Buttons(1 << 11);

    pub const NONE: Buttons = Buttons(0);
    const VALID: u16 = 0x0fff;

    pub fn from_raw(raw: u16) -> Self {
        Buttons(raw & Self::VALID)
    }

    pub fn contains(self, other: Buttons) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// True when exactly `other` is held and nothing else.
    pub fn is_exactly(self, other: Buttons) -> bool {
        self.0 == other.0
    }
}

impl std::ops::BitOr for Buttons {
    type Output = Buttons;

    fn bitor(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 | rhs.0)
    }
}

/// Reads the current button mask for a player. Assumed to always succeed.
pub trait ControllerDriver: Send + Sync {
    fn read_buttons(&self, player: PlayerId) -> Buttons;
}

/// Driver whose masks are set from code. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedController {
    masks: Arc<Mutex<[Buttons; 2]>>,
}

impl ScriptedController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, player: PlayerId, buttons: Buttons) {
        self.masks.lock()[player.index()] = buttons;
    }

    pub fn release(&self, player: PlayerId) {
        self.press(player, Buttons::NONE);
    }

    pub fn release_all(&self) {
        *self.masks.lock() = [Buttons::NONE; 2];
    }
}

impl ControllerDriver for ScriptedController {
    fn read_buttons(&self, player: PlayerId) -> Buttons {
        self.masks.lock()[player.index()]
    }
}

/// Self-playing driver for the demo binary.
///
/// Holds a random mask for a few reads before picking a new one. Start and
/// the loadout confirm button come up often enough that menus get through.
#[derive(Debug)]
pub struct DemoPilot {
    state: Mutex<PilotState>,
}

#[derive(Debug)]
struct PilotState {
    rng: StdRng,
    held: [Buttons; 2],
    hold_for: [u8; 2],
}

impl DemoPilot {
    const MOVES: [Buttons; 6] = [
        Buttons::B,
        Buttons::LEFT,
        Buttons::RIGHT,
        Buttons::Y,
        Buttons::A,
        Buttons::START,
    ];

    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: Mutex::new(PilotState {
                rng,
                held: [Buttons::NONE; 2],
                hold_for: [0; 2],
            }),
        }
    }
}

impl ControllerDriver for DemoPilot {
    fn read_buttons(&self, player: PlayerId) -> Buttons {
        let mut state = self.state.lock();
        let slot = player.index();
        if state.hold_for[slot] == 0 {
            let first = Self::MOVES[state.rng.gen_range(0..Self::MOVES.len())];
            let mask = if state.rng.gen_bool(0.5) {
                first | Buttons::Y
            } else {
                first
            };
            state.held[slot] = mask;
            state.hold_for[slot] = state.rng.gen_range(3..20);
        }
        state.hold_for[slot] -= 1;
        state.held[slot]
    }
}
