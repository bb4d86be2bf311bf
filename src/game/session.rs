use crate::config::GameConfig;
use crate::game::entity::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    #[default]
    InPlay,
    PlayerOneWin,
    PlayerTwoWin,
    /// Every asteroid has been destroyed.
    FieldCleared,
    /// A ship ran into an asteroid.
    ShipDestroyed,
}

impl GameStatus {
    pub fn win_for(player: PlayerId) -> Self {
        match player {
            PlayerId::One => GameStatus::PlayerOneWin,
            PlayerId::Two => GameStatus::PlayerTwoWin,
        }
    }

    pub fn winner(self) -> Option<PlayerId> {
        match self {
            GameStatus::PlayerOneWin => Some(PlayerId::One),
            GameStatus::PlayerTwoWin => Some(PlayerId::Two),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != GameStatus::InPlay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    pub health: i32,
    pub display_index: usize,
    pub knocked_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub status: GameStatus,
    /// Zero-based index of the round that just finished.
    pub round: u32,
    pub scores: [u8; 2],
    pub match_winner: Option<PlayerId>,
}

/// Round, score and health bookkeeping that outlives a single round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub round: u32,
    pub scores: [u8; 2],
    pub health: [i32; 2],
    pub health_index: [usize; 2],
    pub loadout: [usize; 2],
    pub status: GameStatus,
    starting_health: i32,
    max_health_index: usize,
}

impl SessionState {
    pub fn new(config: &GameConfig) -> Self {
        let starting_health = config.starting_health;
        let hits_to_empty = if config.damage_per_hit > 0 {
            (starting_health + config.damage_per_hit - 1) / config.damage_per_hit
        } else {
            0
        };
        Self {
            round: 0,
            scores: [0; 2],
            health: [starting_health; 2],
            health_index: [0; 2],
            loadout: [0, 1],
            status: GameStatus::InPlay,
            starting_health,
            max_health_index: hits_to_empty.max(0) as usize,
        }
    }

    pub fn max_health_index(&self) -> usize {
        self.max_health_index
    }

    pub fn is_first_round(&self) -> bool {
        self.round == 0
    }

    /// Restores per-round state before the world is rebuilt.
    pub fn reset_round(&mut self) {
        self.health = [self.starting_health; 2];
        self.health_index = [0; 2];
        self.status = GameStatus::InPlay;
    }

    /// Records a terminal status. Only the first one in a round sticks.
    pub fn record(&mut self, status: GameStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    pub fn apply_hit(&mut self, victim: PlayerId, damage: i32) -> HitOutcome {
        let slot = victim.index();
        self.health[slot] -= damage;
        self.health_index[slot] = (self.health_index[slot] + 1).min(self.max_health_index);
        HitOutcome {
            health: self.health[slot],
            display_index: self.health_index[slot],
            knocked_out: self.health[slot] <= 0,
        }
    }

    /// Credits the round and decides whether the match is over. Scores and
    /// the round counter go back to zero once a match is decided.
    pub fn finish_round(&mut self, config: &GameConfig) -> RoundSummary {
        let status = self.status;
        let round = self.round;
        if let Some(winner) = status.winner() {
            self.scores[winner.index()] = self.scores[winner.index()].saturating_add(1);
        }
        self.round = self.round.saturating_add(1);
        let scores = self.scores;

        let decided = config.is_duel()
            && (self.round >= u32::from(config.rounds_per_match)
                || self.scores.iter().any(|s| *s >= config.rounds_to_win));
        let match_winner = decided.then(|| {
            if scores[0] > scores[1] {
                PlayerId::One
            } else {
                PlayerId::Two
            }
        });
        if decided {
            self.round = 0;
            self.scores = [0; 2];
        }
        self.health_index = [0; 2];
        RoundSummary {
            status,
            round,
            scores,
            match_winner,
        }
    }
}
