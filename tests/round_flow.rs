use std::sync::Arc;

use arcade_duel::arena::{Arena, SessionPhase};
use arcade_duel::config::{GameConfig, MapLayout};
use arcade_duel::controller::{Buttons, ScriptedController};
use arcade_duel::game::entity::PlayerId;
use arcade_duel::game::session::GameStatus;
use arcade_duel::sprite::mock::{MockSpriteService, SpriteEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Presses whatever each phase waits for. Player one fires at player two
/// for the whole round; player two stays still.
fn spawn_driver(mut phases: watch::Receiver<SessionPhase>, pad: ScriptedController) -> JoinHandle<()> {
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow_and_update();
            match phase {
                SessionPhase::AwaitingStart => pad.press(PlayerId::One, Buttons::START),
                SessionPhase::SelectingLoadout => {
                    pad.press(PlayerId::One, Buttons::A);
                    pad.press(PlayerId::Two, Buttons::A);
                }
                SessionPhase::InRound { .. } => pad.press(PlayerId::One, Buttons::Y),
                _ => pad.release_all(),
            }
        }
    })
}

fn created(sprites: &MockSpriteService, predicate: impl Fn(&str) -> bool) -> usize {
    sprites
        .history()
        .iter()
        .filter(|event| matches!(event, SpriteEvent::Created { image, .. } if predicate(image)))
        .count()
}

fn duel_config() -> GameConfig {
    let mut config = GameConfig::death_tanks();
    config.map = MapLayout::open(960.0, 640.0);
    config.seed = Some(1);
    config
}

#[tokio::test(start_paused = true)]
async fn five_hits_win_the_round_and_two_rounds_the_match() -> Result<(), Box<dyn std::error::Error>> {
    let sprites = MockSpriteService::new();
    sprites.record_history();
    let pad = ScriptedController::new();
    let mut arena = Arena::new(duel_config(), Box::new(sprites.clone()), Arc::new(pad.clone()));
    let driver = spawn_driver(arena.phases(), pad);

    let first = arena.play_round().await?;
    assert_eq!(first.status, GameStatus::PlayerOneWin);
    assert_eq!(first.scores, [1, 0]);
    assert_eq!(first.match_winner, None, "one round is not a match");

    let session = arena.session();
    assert_eq!(session.health[1], 0, "exactly five hits landed");
    assert_eq!(session.health[0], 100);
    assert_eq!(session.round, 1);
    let bars = created(&sprites, |image| {
        image.starts_with("p2_health") || image == "health0.png"
    });
    assert_eq!(bars, 6, "initial bar plus one per hit");
    assert_eq!(created(&sprites, |image| image == "select_screen.png"), 1);

    let second = arena.play_round().await?;
    assert_eq!(second.status, GameStatus::PlayerOneWin);
    assert_eq!(second.match_winner, Some(PlayerId::One));
    assert_eq!(second.scores, [2, 0]);
    assert_eq!(created(&sprites, |image| image == "p1_win.png"), 1);
    assert_eq!(
        created(&sprites, |image| image == "start_screen.png"),
        1,
        "menus run once per match"
    );

    let session = arena.session();
    assert_eq!(session.round, 0, "counters reset after the match");
    assert_eq!(session.scores, [0, 0]);
    assert_eq!(sprites.live_count(), 0, "every round sprite released");

    drop(arena);
    driver.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_field_clears_each_round() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = GameConfig::asteroids();
    config.asteroids.initial_count = 0;
    config.seed = Some(7);
    let sprites = MockSpriteService::new();
    sprites.record_history();
    let pad = ScriptedController::new();
    let mut arena = Arena::new(config, Box::new(sprites.clone()), Arc::new(pad.clone()));
    let driver = spawn_driver(arena.phases(), pad);

    let summaries = arena.run(Some(2)).await?;
    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert_eq!(summary.status, GameStatus::FieldCleared);
        assert_eq!(summary.scores, [0, 0], "no scoring in the asteroid field");
        assert_eq!(summary.match_winner, None);
    }
    assert_eq!(summaries[1].round, 1);
    assert_eq!(created(&sprites, |image| image == "start_screen.png"), 1);
    assert_eq!(created(&sprites, |image| image == "win.png"), 2);
    assert_eq!(created(&sprites, |image| image == "select_screen.png"), 0);

    drop(arena);
    driver.await?;
    Ok(())
}
