pub mod game;
pub mod handlers;
pub mod pool;
pub mod rules;
pub mod server;

use rules::RoundRules;

/// Cards in each pick option. Options are offered as two pairs.
pub const PAIR_SIZE: usize = 2;

/// Cards offered per round.
pub const OPTIONS_PER_ROUND: usize = PAIR_SIZE * 2;

/// Cards previewed for each class, which become the start of the deck.
pub const PREVIEW_CARDS: usize = 2;

#[derive(Clone, Debug)]
pub struct DraftConfig {
    /// Chance that a draw attempts a neutral card before a class card.
    pub neutral_rate: f64,

    /// Copies of a single card allowed in a deck through normal draws.
    pub duplicate_cap: u32,

    /// Rerolls available at the start of each draft.
    pub rerolls: u32,

    pub rules: RoundRules,
}

impl DraftConfig {
    /// Number of cards in a finished deck.
    pub fn deck_target(&self) -> usize {
        PREVIEW_CARDS + PAIR_SIZE * self.rules.rounds() as usize
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        DraftConfig {
            neutral_rate: 0.05,
            duplicate_cap: 3,
            rerolls: 3,
            rules: RoundRules::default(),
        }
    }
}
