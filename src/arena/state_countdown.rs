use std::time::Duration;

use tokio::time;
use tracing::{debug, warn};

use super::tasks::TaskContext;
use crate::config::Timings;
use crate::game::images;
use crate::sprite::SpriteSpec;

const BANNER_DEPTH: u8 = 20;

/// Banners shown before a round, each with its dwell.
pub fn script(round: u32, timings: &Timings) -> Vec<(String, Duration)> {
    let mut steps = Vec::with_capacity(images::COUNTDOWN.len() + 2);
    steps.push((images::round_banner(round), timings.round_banner));
    steps.extend(
        images::COUNTDOWN
            .iter()
            .map(|image| (image.to_string(), timings.countdown_step)),
    );
    steps.push((images::GO.to_string(), timings.go_banner));
    steps
}

pub(super) async fn run(ctx: &TaskContext, round: u32) {
    let (w, h) = (ctx.config.screen_width, ctx.config.screen_height);
    for (image, dwell) in script(round, &ctx.config.timings) {
        let spec = SpriteSpec::new(image, w / 2.0, h / 2.0, w / 2.0, h / 2.0)
            .with_depth(BANNER_DEPTH);
        // A missing banner only costs the visual; the dwell still runs.
        let shown = match ctx.shared.show(&spec) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(image = %spec.image, ?err, "countdown banner skipped");
                None
            }
        };
        time::sleep(dwell).await;
        if let Some(handle) = shown {
            ctx.shared.release(handle);
        }
    }
    debug!(round, "countdown finished");
}
