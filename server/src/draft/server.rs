use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use rand::thread_rng;
use uuid::Uuid;

use crate::cards::{copies_in_deck, mana_curve, sort_deck, Card, CardClass, CURVE_BUCKETS};

use super::{
    game::{ClassPreview, DraftState, Drafter},
    PAIR_SIZE,
};

/// Actions a client may take on its draft.
#[derive(Clone, Copy, Debug)]
pub enum DraftAction {
    ChooseClass(CardClass),
    Pick(usize),
    Reroll,
    Restart,
}

#[derive(Debug, thiserror::Error)]
pub enum DraftServerError {
    #[error("No draft session {0}.")]
    NotFound(Uuid),

    #[error("{0}")]
    Rejected(String),

    #[error("Draft session table unavailable.")]
    Poisoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ClassSelection,
    Drafting,
    Finished,
}

/// An offered card, with the number of copies already in the deck.
#[derive(Clone, Debug, serde::Serialize)]
pub struct OfferedCard {
    #[serde(flatten)]
    card: Card,
    owned: usize,
}

/// Snapshot of a session for rendering.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SessionView {
    id: Uuid,
    phase: Phase,
    previews: Vec<ClassPreview>,
    class: Option<CardClass>,
    round: u32,
    rounds: u32,
    rerolls: u32,

    /// Deck sorted for display.
    deck: Vec<Card>,
    deck_size: usize,
    deck_target: usize,
    curve: [usize; CURVE_BUCKETS],

    /// Offered cards grouped into the pairs that may be picked.
    options: Vec<Vec<OfferedCard>>,
    is_finished: bool,
}

impl SessionView {
    fn new(id: Uuid, state: &DraftState, drafter: &Drafter) -> Self {
        let config = drafter.config();
        let mut view = SessionView {
            id,
            phase: Phase::ClassSelection,
            previews: state.previews().to_vec(),
            class: None,
            round: 0,
            rounds: config.rules.rounds(),
            rerolls: config.rerolls,
            deck: Vec::new(),
            deck_size: 0,
            deck_target: config.deck_target(),
            curve: [0; CURVE_BUCKETS],
            options: Vec::new(),
            is_finished: false,
        };

        if let Some(session) = state.session() {
            let deck = session.deck();
            view.phase = if session.is_finished() {
                Phase::Finished
            } else {
                Phase::Drafting
            };
            view.class = Some(session.class());
            view.round = session.round();
            view.rerolls = session.rerolls();
            view.deck = sort_deck(deck);
            view.deck_size = deck.len();
            view.curve = mana_curve(deck);
            view.options = session
                .options()
                .chunks(PAIR_SIZE)
                .map(|pair| {
                    pair.iter()
                        .map(|card| OfferedCard {
                            card: card.clone(),
                            owned: copies_in_deck(deck, card.name()),
                        })
                        .collect()
                })
                .collect();
        }
        view.is_finished = state.is_finished();

        view
    }

    #[cfg(test)]
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// A session and when it was last used.
#[derive(Debug)]
struct Entry {
    state: DraftState,
    touched: Instant,
}

/// Table of live draft sessions, one per client. Sessions idle for longer
/// than the configured time to live are dropped whenever a new session is
/// created.
#[derive(Debug)]
pub struct DraftServer {
    drafter: Drafter,
    session_ttl: Duration,
    sessions: Mutex<HashMap<Uuid, Entry>>,
}

impl DraftServer {
    pub fn new(drafter: Drafter, session_ttl: Duration) -> Self {
        Self {
            drafter,
            session_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Entry>>, DraftServerError> {
        self.sessions.lock().map_err(|_| DraftServerError::Poisoned)
    }

    /// Start a new session at class selection.
    pub fn create(&self) -> Result<SessionView, DraftServerError> {
        let now = Instant::now();
        let mut sessions = self.lock()?;
        self.evict_idle(&mut sessions, now);

        let id = Uuid::new_v4();
        let state = self.drafter.begin(&mut thread_rng());
        let view = SessionView::new(id, &state, &self.drafter);
        sessions.insert(
            id,
            Entry {
                state,
                touched: now,
            },
        );
        tracing::debug!("Created draft session {id}, {} active.", sessions.len());
        Ok(view)
    }

    pub fn view(&self, id: Uuid) -> Result<SessionView, DraftServerError> {
        let mut sessions = self.lock()?;
        let entry = sessions
            .get_mut(&id)
            .ok_or(DraftServerError::NotFound(id))?;
        entry.touched = Instant::now();
        Ok(SessionView::new(id, &entry.state, &self.drafter))
    }

    /// Apply an action to a session. A rejected action leaves the session
    /// unchanged.
    pub fn apply(&self, id: Uuid, action: DraftAction) -> Result<SessionView, DraftServerError> {
        let mut sessions = self.lock()?;
        let entry = sessions
            .get_mut(&id)
            .ok_or(DraftServerError::NotFound(id))?;
        entry.touched = Instant::now();

        let state = &mut entry.state;
        let rng = &mut thread_rng();
        let result = match action {
            DraftAction::ChooseClass(class) => self.drafter.choose_class(state, class, rng),
            DraftAction::Pick(pair) => self.drafter.pick_pair(state, pair, rng),
            DraftAction::Reroll => self.drafter.reroll(state, rng),
            DraftAction::Restart => {
                self.drafter.restart(state, rng);
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::debug!("Rejected {action:?} for session {id}: {e}");
            return Err(DraftServerError::Rejected(e));
        }

        Ok(SessionView::new(id, state, &self.drafter))
    }

    pub fn remove(&self, id: Uuid) -> Result<(), DraftServerError> {
        let mut sessions = self.lock()?;
        match sessions.remove(&id) {
            Some(_) => {
                tracing::debug!("Removed draft session {id}.");
                Ok(())
            }
            None => Err(DraftServerError::NotFound(id)),
        }
    }

    /// Drop every session not used within the time to live as of `now`.
    /// Returns the number of sessions dropped.
    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            now.saturating_duration_since(entry.touched) < self.session_ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!("Evicted {evicted} idle draft sessions.");
        }
        evicted
    }
}
