use std::fmt::Debug;

use rand::{seq::SliceRandom, Rng};

use crate::cards::{copies_in_deck, Card, CardClass, Rarity};

use super::DraftConfig;

/// Card catalog bucketed by rarity, which is the first filter of every draw.
#[derive(Clone)]
pub struct CardPool {
    bronzes: Vec<Card>,
    silvers: Vec<Card>,
    golds: Vec<Card>,
    rainbows: Vec<Card>,
}

/// Constraints for a single card draw.
pub struct Draw<'a> {
    pub rarity: Rarity,
    pub class: CardClass,

    /// Cards whose names may not be drawn, e.g. earlier picks of the same
    /// batch.
    pub excluded: &'a [Card],

    /// Deck the duplicate cap is counted against.
    pub deck: &'a [Card],

    pub allow_neutral: bool,
}

impl CardPool {
    pub fn new() -> Self {
        Self {
            bronzes: Vec::new(),
            silvers: Vec::new(),
            golds: Vec::new(),
            rainbows: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn sample(
        class: CardClass,
        bronzes: usize,
        silvers: usize,
        golds: usize,
        rainbows: usize,
    ) -> Self {
        let mut pool = Self::new();
        for (rarity, count) in [
            (Rarity::Bronze, bronzes),
            (Rarity::Silver, silvers),
            (Rarity::Gold, golds),
            (Rarity::Rainbow, rainbows),
        ] {
            for _ in 0..count {
                pool.add(Card::sample(rarity, class));
            }
        }
        pool
    }

    pub fn add(&mut self, card: Card) {
        match card.rarity {
            Rarity::Bronze => self.bronzes.push(card),
            Rarity::Silver => self.silvers.push(card),
            Rarity::Gold => self.golds.push(card),
            Rarity::Rainbow => self.rainbows.push(card),
        }
    }

    pub fn size(&self) -> usize {
        self.bronzes.len() + self.silvers.len() + self.golds.len() + self.rainbows.len()
    }

    fn cards_of(&self, rarity: Rarity) -> &[Card] {
        match rarity {
            Rarity::Bronze => &self.bronzes,
            Rarity::Silver => &self.silvers,
            Rarity::Gold => &self.golds,
            Rarity::Rainbow => &self.rainbows,
        }
    }

    /// Draw a card satisfying the constraints as closely as possible.
    ///
    /// With probability `neutral_rate` (and only when neutral cards are
    /// allowed) a neutral card is attempted first. Otherwise, or if no neutral
    /// card qualifies, a class card below the duplicate cap is drawn. If
    /// neither pool has a candidate the duplicate cap is relaxed and class and
    /// neutral cards are drawn from together. If even that is empty the
    /// placeholder card is returned, so a draw never fails.
    pub fn roll<R: Rng + ?Sized>(&self, draw: &Draw, config: &DraftConfig, rng: &mut R) -> Card {
        let candidates = self.cards_of(draw.rarity);
        let excluded = |card: &Card| draw.excluded.iter().any(|e| e.name() == card.name());

        let try_neutral = draw.allow_neutral && rng.gen::<f64>() < config.neutral_rate;
        if try_neutral {
            let neutrals: Vec<&Card> = candidates
                .iter()
                .filter(|c| c.class.is_neutral() && !excluded(*c))
                .collect();
            if let Some(card) = neutrals.choose(rng) {
                return (*card).clone();
            }
        }

        let class_cards: Vec<&Card> = candidates
            .iter()
            .filter(|c| {
                c.class == draw.class
                    && !excluded(*c)
                    && copies_in_deck(draw.deck, c.name()) < config.duplicate_cap as usize
            })
            .collect();
        if let Some(card) = class_cards.choose(rng) {
            return (*card).clone();
        }

        let relaxed: Vec<&Card> = candidates
            .iter()
            .filter(|c| {
                (c.class == draw.class || (draw.allow_neutral && c.class.is_neutral()))
                    && !excluded(*c)
            })
            .collect();
        if let Some(card) = relaxed.choose(rng) {
            tracing::debug!(
                "No {:?} {:?} card under the duplicate cap, drew {} from the relaxed pool.",
                draw.class,
                draw.rarity,
                card.name()
            );
            return (*card).clone();
        }

        tracing::warn!(
            "No {:?} card available for {:?}, using placeholder.",
            draw.rarity,
            draw.class
        );
        Card::placeholder()
    }
}

impl Debug for CardPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CardPool {{ bronzes: {}, silvers: {}, golds: {}, rainbows: {} }}",
            self.bronzes.len(),
            self.silvers.len(),
            self.golds.len(),
            self.rainbows.len()
        )
    }
}

impl FromIterator<Card> for CardPool {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut pool = Self::new();
        for card in iter {
            pool.add(card);
        }
        pool
    }
}
