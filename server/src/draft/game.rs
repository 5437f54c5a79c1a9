use rand::Rng;

use crate::{
    cards::{Card, CardClass},
    err, Res,
};

use super::{
    pool::{CardPool, Draw},
    rules::WeightTable,
    DraftConfig, OPTIONS_PER_ROUND, PAIR_SIZE, PREVIEW_CARDS,
};

/// Cards shown for a class before it is chosen. Choosing the class starts the
/// deck with exactly these cards.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ClassPreview {
    pub class: CardClass,
    pub cards: Vec<Card>,
}

/// A draft in progress or completed.
#[derive(Clone, Debug)]
pub struct Session {
    class: CardClass,
    deck: Vec<Card>,
    round: u32,
    rerolls: u32,
    options: Vec<Card>,
    finished: bool,
}

impl Session {
    pub fn class(&self) -> CardClass {
        self.class
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn rerolls(&self) -> u32 {
        self.rerolls
    }

    /// Cards currently on offer. Empty once the draft is finished.
    pub fn options(&self) -> &[Card] {
        &self.options
    }

    /// The two cards making up a pick option, if the pair exists.
    pub fn pair(&self, pair: usize) -> Option<&[Card]> {
        let start = pair.checked_mul(PAIR_SIZE)?;
        self.options.get(start..start.checked_add(PAIR_SIZE)?)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// State of a single player's draft. All mutation goes through `Drafter`.
#[derive(Clone, Debug)]
pub enum DraftState {
    /// Picking a class. Holds a preview for every playable class.
    ClassSelection(Vec<ClassPreview>),
    Draft(Session),
}

impl DraftState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            DraftState::ClassSelection(_) => None,
            DraftState::Draft(session) => Some(session),
        }
    }

    pub fn previews(&self) -> &[ClassPreview] {
        match self {
            DraftState::ClassSelection(previews) => previews,
            DraftState::Draft(_) => &[],
        }
    }

    pub fn is_finished(&self) -> bool {
        self.session().is_some_and(Session::is_finished)
    }
}

/// Runs drafts against a fixed card pool and configuration. Holds no per-draft
/// state, so one `Drafter` serves any number of `DraftState`s.
#[derive(Debug)]
pub struct Drafter {
    pool: CardPool,
    config: DraftConfig,
}

impl Drafter {
    pub fn new(pool: CardPool, config: DraftConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &DraftConfig {
        &self.config
    }

    /// Begin a new draft at class selection, previewing cards for each class.
    pub fn begin<R: Rng + ?Sized>(&self, rng: &mut R) -> DraftState {
        let previews = CardClass::PLAYABLE
            .iter()
            .map(|&class| ClassPreview {
                class,
                cards: self.draw_batch(
                    class,
                    &[],
                    self.config.rules.preview(),
                    PREVIEW_CARDS,
                    false,
                    rng,
                ),
            })
            .collect();
        DraftState::ClassSelection(previews)
    }

    /// Discard the current draft and return to class selection.
    pub fn restart<R: Rng + ?Sized>(&self, state: &mut DraftState, rng: &mut R) {
        tracing::debug!("Restarting draft.");
        *state = self.begin(rng);
    }

    /// Choose a class, starting the deck with that class's preview cards and
    /// offering the first round's options.
    pub fn choose_class<R: Rng + ?Sized>(
        &self,
        state: &mut DraftState,
        class: CardClass,
        rng: &mut R,
    ) -> Res<()> {
        let DraftState::ClassSelection(previews) = state else {
            return err("Class already chosen.");
        };
        let Some(preview) = previews.iter().find(|p| p.class == class) else {
            return err(format!("{class:?} is not a playable class."));
        };

        let mut session = Session {
            class,
            deck: preview.cards.clone(),
            round: 1,
            rerolls: self.config.rerolls,
            options: Vec::new(),
            finished: false,
        };
        session.options = self.round_options(&session, rng);
        tracing::debug!("Started {class:?} draft.");

        *state = DraftState::Draft(session);
        Ok(())
    }

    /// Add the chosen pair to the deck. Pair 0 is the first two options, pair
    /// 1 the last two. Finishes the draft after the final round, otherwise
    /// advances to the next round.
    pub fn pick_pair<R: Rng + ?Sized>(
        &self,
        state: &mut DraftState,
        pair: usize,
        rng: &mut R,
    ) -> Res<()> {
        let session = self.active_session(state)?;
        let Some(picked) = session.pair(pair).map(<[Card]>::to_vec) else {
            return err(format!("Invalid pair: {pair}."));
        };

        session.deck.extend(picked);
        if session.round >= self.config.rules.rounds() {
            session.options.clear();
            session.finished = true;
            tracing::debug!("Draft finished with {} cards.", session.deck.len());
            debug_assert!(session.deck.len() == self.config.deck_target());
        } else {
            session.round += 1;
            session.options = self.round_options(session, rng);
        }
        Ok(())
    }

    /// Spend a reroll to replace every option with draws from the reroll
    /// table. The round and deck are unchanged.
    pub fn reroll<R: Rng + ?Sized>(&self, state: &mut DraftState, rng: &mut R) -> Res<()> {
        let session = self.active_session(state)?;
        if session.rerolls == 0 {
            return err("No rerolls remaining.");
        }

        session.rerolls -= 1;
        session.options = self.draw_batch(
            session.class,
            &session.deck,
            self.config.rules.reroll(),
            OPTIONS_PER_ROUND,
            true,
            rng,
        );
        tracing::debug!(
            "Rerolled round {}, {} rerolls left.",
            session.round,
            session.rerolls
        );
        Ok(())
    }

    /// Session that can still accept picks and rerolls.
    fn active_session<'a>(&self, state: &'a mut DraftState) -> Res<&'a mut Session> {
        match state {
            DraftState::ClassSelection(_) => err("No class chosen."),
            DraftState::Draft(session) if session.finished => err("Draft is finished."),
            DraftState::Draft(session) => Ok(session),
        }
    }

    fn round_options<R: Rng + ?Sized>(&self, session: &Session, rng: &mut R) -> Vec<Card> {
        debug_assert!(
            self.config.rules.round(session.round).is_some(),
            "No weight table for round {}.",
            session.round
        );

        let empty = WeightTable::default();
        let table = match self.config.rules.round(session.round) {
            Some(table) => table,
            None => {
                tracing::warn!("No weight table for round {}, drawing bronze.", session.round);
                &empty
            }
        };
        self.draw_batch(session.class, &session.deck, table, OPTIONS_PER_ROUND, true, rng)
    }

    /// Draw `count` cards, each excluding the cards already drawn in this
    /// batch so no name repeats within it.
    fn draw_batch<R: Rng + ?Sized>(
        &self,
        class: CardClass,
        deck: &[Card],
        table: &WeightTable,
        count: usize,
        allow_neutral: bool,
        rng: &mut R,
    ) -> Vec<Card> {
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            let draw = Draw {
                rarity: table.sample(rng),
                class,
                excluded: &batch,
                deck,
                allow_neutral,
            };
            let card = self.pool.roll(&draw, &self.config, rng);
            batch.push(card);
        }
        batch
    }
}
