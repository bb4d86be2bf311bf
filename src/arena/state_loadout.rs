use tokio::time;
use tracing::{debug, info, warn};

use super::tasks::TaskContext;
use crate::controller::Buttons;
use crate::error::EngineError;
use crate::game::entity::PlayerId;
use crate::game::images;
use crate::sprite::{SpriteHandle, SpriteSpec};

const HOVER_SIZE: f32 = 100.0;
const SCREEN_DEPTH: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Moved,
    Confirmed,
    Idle,
}

/// One player's position in the appearance menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadoutCursor {
    choice: usize,
    choices: usize,
    confirmed: bool,
}

impl LoadoutCursor {
    pub fn new(initial: usize, choices: usize) -> Self {
        let choices = choices.max(1);
        Self {
            choice: initial % choices,
            choices,
            confirmed: false,
        }
    }

    pub fn choice(&self) -> usize {
        self.choice
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Only a lone Left, Right or A counts; chords are ignored.
    pub fn handle(&mut self, buttons: Buttons) -> CursorMove {
        if self.confirmed {
            return CursorMove::Idle;
        }
        if buttons.is_exactly(Buttons::RIGHT) {
            self.choice = (self.choice + 1) % self.choices;
            CursorMove::Moved
        } else if buttons.is_exactly(Buttons::LEFT) {
            self.choice = (self.choice + self.choices - 1) % self.choices;
            CursorMove::Moved
        } else if buttons.is_exactly(Buttons::A) {
            self.confirmed = true;
            CursorMove::Confirmed
        } else {
            CursorMove::Idle
        }
    }
}

fn hover_spec(ctx: &TaskContext, player: PlayerId, choice: usize) -> SpriteSpec {
    let w = ctx.config.screen_width;
    let x = ((2 * choice + 1) as f32 * w) / 8.0;
    SpriteSpec::square(
        images::player_hover(player),
        x,
        ctx.config.screen_height / 2.0,
        HOVER_SIZE,
    )
    .with_depth(SCREEN_DEPTH + 1)
}

/// Lets every configured player pick a ship and stores the picks in the
/// session once all of them have confirmed.
pub(super) async fn run(ctx: &TaskContext) -> Result<[usize; 2], EngineError> {
    let config = &ctx.config;
    let (w, h) = (config.screen_width, config.screen_height);
    let players = PlayerId::first(config.players);
    let screen = ctx.shared.show(
        &SpriteSpec::new(images::SELECT_SCREEN, w / 2.0, h / 2.0, w, h).with_depth(SCREEN_DEPTH),
    )?;

    let initial = ctx.shared.lock().session.loadout;
    let mut cursors = initial.map(|choice| LoadoutCursor::new(choice, config.loadout_choices));
    let mut hovers: [Option<SpriteHandle>; 2] = [None, None];
    for &player in players {
        let slot = player.index();
        match ctx.shared.show(&hover_spec(ctx, player, cursors[slot].choice())) {
            Ok(handle) => hovers[slot] = Some(handle),
            Err(err) => warn!(?player, ?err, "hover highlight skipped"),
        }
    }

    while !players.iter().all(|p| cursors[p.index()].is_confirmed()) {
        for &player in players {
            let slot = player.index();
            let buttons = ctx.controller.read_buttons(player);
            match cursors[slot].handle(buttons) {
                CursorMove::Moved => {
                    if let Some(old) = hovers[slot].take() {
                        ctx.shared.release(old);
                    }
                    let choice = cursors[slot].choice();
                    match ctx.shared.show(&hover_spec(ctx, player, choice)) {
                        Ok(handle) => hovers[slot] = Some(handle),
                        Err(err) => warn!(?player, ?err, "hover highlight skipped"),
                    }
                    debug!(?player, choice, "loadout changed");
                }
                CursorMove::Confirmed => {
                    info!(?player, choice = cursors[slot].choice(), "loadout confirmed")
                }
                CursorMove::Idle => {}
            }
        }
        time::sleep(config.timings.loadout_poll).await;
    }

    time::sleep(config.timings.loadout_exit).await;
    for handle in hovers.into_iter().flatten() {
        ctx.shared.release(handle);
    }
    ctx.shared.release(screen);

    let picks = [cursors[0].choice(), cursors[1].choice()];
    ctx.shared.lock().session.loadout = picks;
    Ok(picks)
}
