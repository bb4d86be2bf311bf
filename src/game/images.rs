//! Image names understood by the sprite service.

use crate::game::entity::PlayerId;
use crate::game::session::GameStatus;

pub const START_SCREEN: &str = "start_screen.png";
pub const PRESS_START: &str = "press_start.png";
pub const SELECT_SCREEN: &str = "select_screen.png";
pub const GO: &str = "go.png";
pub const COUNTDOWN: [&str; 3] = ["3.png", "2.png", "1.png"];
pub const FIELD_CLEARED: &str = "win.png";
pub const SHIP_DESTROYED: &str = "lose.png";
pub const BULLET: &str = "bullet.png";

pub fn ship(variant_duel: bool, player: PlayerId, loadout: usize) -> String {
    match (variant_duel, player) {
        (true, _) => format!("tank{loadout}.png"),
        (false, PlayerId::One) => "ship2.png".to_string(),
        (false, PlayerId::Two) => "ship.png".to_string(),
    }
}

pub fn projectile(variant_duel: bool, loadout: usize) -> String {
    if variant_duel {
        format!("bullet{loadout}.png")
    } else {
        BULLET.to_string()
    }
}

pub fn asteroid(tier: u8) -> String {
    format!("a{tier}.png")
}

pub fn round_banner(round: u32) -> String {
    format!("round{}.png", round + 1)
}

pub fn player_hover(player: PlayerId) -> String {
    format!("p{}.png", player.index() + 1)
}

/// Health bar for `index` hits taken; the last index is the empty bar.
pub fn health(player: PlayerId, index: usize, max_index: usize) -> String {
    let remaining = max_index.saturating_sub(index);
    if remaining == 0 {
        "health0.png".to_string()
    } else {
        format!("p{}_health{remaining}.png", player.index() + 1)
    }
}

pub fn round_result(status: GameStatus) -> Option<String> {
    match status {
        GameStatus::InPlay => None,
        GameStatus::PlayerOneWin | GameStatus::PlayerTwoWin => status
            .winner()
            .map(|p| format!("p{}_win_round.png", p.index() + 1)),
        GameStatus::FieldCleared => Some(FIELD_CLEARED.to_string()),
        GameStatus::ShipDestroyed => Some(SHIP_DESTROYED.to_string()),
    }
}

pub fn match_result(winner: PlayerId) -> String {
    format!("p{}_win.png", winner.index() + 1)
}
