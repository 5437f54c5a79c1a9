use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;

pub mod catalog;

/// Number of mana curve buckets. The final bucket collects every card costing
/// this many minus one or more.
pub const CURVE_BUCKETS: usize = 9;

/// Card rarity, in ascending sort priority.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Rarity {
    #[serde(rename = "銅", alias = "Bronze")]
    Bronze,
    #[serde(rename = "銀", alias = "Silver")]
    Silver,
    #[serde(rename = "金", alias = "Gold")]
    Gold,
    #[serde(rename = "虹", alias = "Rainbow")]
    Rainbow,
}

impl Rarity {
    #[cfg(test)]
    pub const ALL: [Rarity; 4] = [Rarity::Bronze, Rarity::Silver, Rarity::Gold, Rarity::Rainbow];

    /// Sort priority used when ordering a deck list.
    pub fn priority(self) -> u8 {
        match self {
            Rarity::Bronze => 1,
            Rarity::Silver => 2,
            Rarity::Gold => 3,
            Rarity::Rainbow => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CardClass {
    #[serde(rename = "精靈", alias = "Forestcraft")]
    Forestcraft,
    #[serde(rename = "皇家", alias = "Swordcraft")]
    Swordcraft,
    #[serde(rename = "巫師", alias = "Runecraft")]
    Runecraft,
    #[serde(rename = "龍族", alias = "Dragoncraft")]
    Dragoncraft,
    #[serde(rename = "夜魔", alias = "Abysscraft")]
    Abysscraft,
    #[serde(rename = "主教", alias = "Havencraft")]
    Havencraft,
    #[serde(rename = "復仇者", alias = "Portalcraft")]
    Portalcraft,
    #[serde(rename = "中立", alias = "Neutral")]
    Neutral,
}

impl CardClass {
    /// The classes a player may draft, in the order they are offered.
    pub const PLAYABLE: [CardClass; 7] = [
        CardClass::Forestcraft,
        CardClass::Swordcraft,
        CardClass::Runecraft,
        CardClass::Dragoncraft,
        CardClass::Abysscraft,
        CardClass::Havencraft,
        CardClass::Portalcraft,
    ];

    pub fn is_neutral(self) -> bool {
        self == CardClass::Neutral
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Card {
    name: String,
    cost: u32,
    pub rarity: Rarity,
    pub class: CardClass,
    /// Image URL. An empty string in the catalog means no image.
    #[serde(default, deserialize_with = "non_empty")]
    image: Option<String>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

impl Card {
    /// Card shown when no catalog card satisfies a draw. Always displayable.
    pub fn placeholder() -> Self {
        Self {
            name: "Unavailable".to_string(),
            cost: 0,
            rarity: Rarity::Bronze,
            class: CardClass::Neutral,
            image: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    #[cfg(test)]
    pub fn sample(rarity: Rarity, class: CardClass) -> Self {
        static ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(1);

        let id = ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self {
            name: format!("Card {id}"),
            cost: (id % 10) as u32,
            rarity,
            class,
            image: Some(format!("https://example.com/card-{id}.png")),
        }
    }

    #[cfg(test)]
    pub fn named(name: &str, cost: u32, rarity: Rarity) -> Self {
        Self {
            name: name.to_string(),
            cost,
            rarity,
            class: CardClass::Forestcraft,
            image: None,
        }
    }
}

/// Collator for card names. The catalog is in Traditional Chinese.
fn name_collator() -> Option<Collator> {
    match Collator::try_new(&locale!("zh-Hant").into(), CollatorOptions::new()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            tracing::warn!("Failed to load zh-Hant collation, sorting names by code point: {e}");
            None
        }
    }
}

/// Locale-aware name ordering, falling back to an exact comparison so that
/// the order is total.
fn compare_names(collator: Option<&Collator>, a: &str, b: &str) -> Ordering {
    match collator {
        Some(collator) => collator.compare(a, b),
        None => Ordering::Equal,
    }
    .then_with(|| a.cmp(b))
}

/// Produce a copy of the deck ordered by cost, then rarity, then name.
pub fn sort_deck(cards: &[Card]) -> Vec<Card> {
    let collator = name_collator();
    let mut sorted = cards.to_vec();
    sorted.sort_by(|a, b| {
        a.cost
            .cmp(&b.cost)
            .then(a.rarity.priority().cmp(&b.rarity.priority()))
            .then_with(|| compare_names(collator.as_ref(), &a.name, &b.name))
    });
    sorted
}

/// Count of cards at each cost, with everything at the top cost or above
/// collected in the last bucket.
pub fn mana_curve(cards: &[Card]) -> [usize; CURVE_BUCKETS] {
    let mut curve = [0; CURVE_BUCKETS];
    for card in cards {
        let bucket = (card.cost() as usize).min(CURVE_BUCKETS - 1);
        curve[bucket] += 1;
    }
    curve
}

/// Number of copies of the named card in the deck.
pub fn copies_in_deck(deck: &[Card], name: &str) -> usize {
    deck.iter().filter(|c| c.name == name).count()
}
