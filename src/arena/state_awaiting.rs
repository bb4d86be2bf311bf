use tokio::time;
use tracing::{info, warn};

use super::tasks::TaskContext;
use crate::config::Timings;
use crate::controller::Buttons;
use crate::error::EngineError;
use crate::game::entity::PlayerId;
use crate::game::images;
use crate::sprite::{SpriteHandle, SpriteSpec};

const SCREEN_DEPTH: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blink {
    Show,
    Hide,
    Hold,
}

/// Poll counter driving the "press start" banner.
#[derive(Debug, Clone)]
pub struct BlinkTimer {
    polls: u32,
    on_at: u32,
    off_at: u32,
}

impl BlinkTimer {
    pub fn new(timings: &Timings) -> Self {
        Self {
            polls: 0,
            on_at: timings.start_blink_on,
            off_at: timings.start_blink_off,
        }
    }

    pub fn poll(&mut self) -> Blink {
        self.polls += 1;
        if self.polls >= self.off_at {
            self.polls = 0;
            Blink::Hide
        } else if self.polls == self.on_at {
            Blink::Show
        } else {
            Blink::Hold
        }
    }
}

fn start_pressed(ctx: &TaskContext) -> Option<PlayerId> {
    PlayerId::first(ctx.config.players)
        .iter()
        .copied()
        .find(|&player| ctx.controller.read_buttons(player).contains(Buttons::START))
}

/// Shows the start screen until any configured player presses Start.
pub(super) async fn run(ctx: &TaskContext) -> Result<PlayerId, EngineError> {
    let config = &ctx.config;
    let (w, h) = (config.screen_width, config.screen_height);
    let screen = ctx.shared.show(
        &SpriteSpec::new(images::START_SCREEN, w / 2.0, h / 2.0, w, h).with_depth(SCREEN_DEPTH),
    )?;
    let banner_spec = SpriteSpec::new(images::PRESS_START, w / 2.0, h * 0.75, w / 2.0, h / 8.0)
        .with_depth(SCREEN_DEPTH + 1);

    let mut blink = BlinkTimer::new(&config.timings);
    let mut banner: Option<SpriteHandle> = None;
    let player = loop {
        if let Some(player) = start_pressed(ctx) {
            break player;
        }
        match blink.poll() {
            Blink::Show => match ctx.shared.show(&banner_spec) {
                Ok(handle) => banner = Some(handle),
                Err(err) => warn!(?err, "press start banner skipped"),
            },
            Blink::Hide => {
                if let Some(handle) = banner.take() {
                    ctx.shared.release(handle);
                }
            }
            Blink::Hold => {}
        }
        time::sleep(config.timings.start_poll).await;
    };
    info!(?player, "start pressed");

    time::sleep(config.timings.start_ack).await;
    if let Some(handle) = banner.take() {
        ctx.shared.release(handle);
    }
    time::sleep(config.timings.start_exit).await;
    ctx.shared.release(screen);
    Ok(player)
}
