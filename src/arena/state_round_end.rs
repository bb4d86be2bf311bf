use std::time::Duration;

use tokio::time;
use tracing::{info, warn};

use super::tasks::TaskContext;
use crate::game::entity::PlayerId;
use crate::game::images;
use crate::game::session::RoundSummary;
use crate::sprite::SpriteSpec;

const RESULT_DEPTH: u8 = 100;

async fn banner(ctx: &TaskContext, image: String, dwell: Duration) {
    let (w, h) = (ctx.config.screen_width, ctx.config.screen_height);
    let spec = SpriteSpec::new(image, w / 2.0, h / 2.0, w / 2.0, h / 2.0).with_depth(RESULT_DEPTH);
    let shown = match ctx.shared.show(&spec) {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(image = %spec.image, ?err, "result banner skipped");
            None
        }
    };
    time::sleep(dwell).await;
    if let Some(handle) = shown {
        ctx.shared.release(handle);
    }
}

/// Shows the round result, then credits it. The returned summary tells the
/// caller whether the match was decided.
pub(super) async fn run(ctx: &TaskContext) -> RoundSummary {
    let status = ctx.shared.lock().session.status;
    if let Some(image) = images::round_result(status) {
        banner(ctx, image, ctx.config.timings.round_end_dwell).await;
    }
    let summary = ctx.shared.lock().session.finish_round(&ctx.config);
    info!(
        round = summary.round,
        ?status,
        scores = ?summary.scores,
        "round finished"
    );
    summary
}

pub(super) async fn match_end(ctx: &TaskContext, winner: PlayerId) {
    info!(?winner, "match decided");
    banner(
        ctx,
        images::match_result(winner),
        ctx.config.timings.match_end_dwell,
    )
    .await;
}
