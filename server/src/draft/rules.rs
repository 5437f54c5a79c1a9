use rand::Rng;

use crate::{cards::Rarity, err, Res};

/// The range uniform draws are made from. Weights are compared against a
/// running sum in this range, so tables summing to this total behave as
/// percentages.
const DRAW_RANGE: f64 = 100.0;

/// Ordered list of (rarity, weight) pairs. Order matters: a draw selects the
/// first entry whose cumulative weight reaches the drawn value.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WeightTable(Vec<(Rarity, f64)>);

impl WeightTable {
    #[cfg(test)]
    pub fn new(entries: Vec<(Rarity, f64)>) -> Self {
        Self(entries)
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[(Rarity, f64)] {
        &self.0
    }

    /// Draw a rarity. Falls back to bronze if the table never reaches the
    /// drawn value, which includes the empty table.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Rarity {
        let draw = rng.gen::<f64>() * DRAW_RANGE;
        let mut sum = 0.0;
        for &(rarity, weight) in &self.0 {
            sum += weight;
            if sum >= draw {
                return rarity;
            }
        }
        Rarity::Bronze
    }

    fn validate(&self, label: &str) -> Res<()> {
        match self.0.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            Some((rarity, weight)) => err(format!(
                "Invalid weight {weight} for {rarity:?} in {label} table."
            )),
            None => Ok(()),
        }
    }
}

fn table(entries: &[(Rarity, f64)]) -> WeightTable {
    WeightTable(entries.to_vec())
}

/// Weight tables for every stage of the draft.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RoundRules {
    /// Used for the two cards previewed for each class before the draft.
    preview: WeightTable,

    /// One table per draft round, round 1 first.
    rounds: Vec<WeightTable>,

    /// Used for every reroll, regardless of round.
    reroll: WeightTable,
}

impl RoundRules {
    /// Parse and validate a rules override.
    pub fn from_json(json: &str) -> Res<Self> {
        let rules: RoundRules = match serde_json::from_str(json) {
            Ok(rules) => rules,
            Err(e) => return err(format!("Failed to parse round rules: {e}")),
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Res<()> {
        if self.rounds.is_empty() {
            return err("Round rules must define at least one round.");
        }

        self.preview.validate("preview")?;
        self.reroll.validate("reroll")?;
        for (i, round) in self.rounds.iter().enumerate() {
            round.validate(&format!("round {}", i + 1))?;
        }
        Ok(())
    }

    pub fn preview(&self) -> &WeightTable {
        &self.preview
    }

    pub fn reroll(&self) -> &WeightTable {
        &self.reroll
    }

    /// Table for a 1-indexed round, if the round exists.
    pub fn round(&self, round: u32) -> Option<&WeightTable> {
        let index = (round as usize).checked_sub(1)?;
        self.rounds.get(index)
    }

    /// Number of draft rounds.
    pub fn rounds(&self) -> u32 {
        self.rounds.len() as u32
    }
}

impl Default for RoundRules {
    fn default() -> Self {
        use Rarity::*;

        Self {
            preview: table(&[(Rainbow, 80.0), (Gold, 20.0)]),
            rounds: vec![
                table(&[(Bronze, 100.0)]),
                table(&[(Silver, 100.0)]),
                table(&[(Gold, 100.0)]),
                table(&[(Rainbow, 50.0), (Gold, 50.0)]),
                table(&[(Bronze, 50.0), (Silver, 50.0)]),
                table(&[(Silver, 50.0), (Gold, 50.0)]),
                table(&[(Bronze, 80.0), (Silver, 20.0)]),
                table(&[(Silver, 80.0), (Gold, 20.0)]),
                table(&[(Silver, 60.0), (Gold, 40.0)]),
                table(&[(Bronze, 65.0), (Gold, 22.0), (Silver, 10.0), (Rainbow, 3.0)]),
                table(&[(Silver, 65.0), (Bronze, 20.0), (Gold, 12.0), (Rainbow, 3.0)]),
                table(&[(Gold, 67.0), (Silver, 20.0), (Bronze, 10.0), (Rainbow, 3.0)]),
                table(&[(Bronze, 80.0), (Silver, 20.0), (Rainbow, 1.0)]),
                table(&[(Silver, 70.0), (Gold, 30.0), (Rainbow, 1.0)]),
                table(&[(Silver, 59.0), (Gold, 40.0), (Rainbow, 1.0)]),
                table(&[(Bronze, 80.0), (Silver, 20.0)]),
                table(&[(Silver, 80.0), (Bronze, 20.0)]),
                table(&[(Gold, 80.0), (Silver, 20.0)]),
                table(&[(Rainbow, 80.0), (Gold, 20.0)]),
            ],
            reroll: table(&[(Bronze, 5.0), (Silver, 15.0), (Gold, 65.0), (Rainbow, 15.0)]),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use rand::{rngs::mock::StepRng, rngs::StdRng, SeedableRng};

    use crate::cards::Rarity;

    use super::{RoundRules, WeightTable, DRAW_RANGE};

    const TRIALS: usize = 10_000;

    /// Share of draws each rarity should receive. Weight beyond the draw range
    /// can never be reached.
    fn expected_shares(table: &WeightTable) -> HashMap<Rarity, f64> {
        let mut shares = HashMap::new();
        let mut sum: f64 = 0.0;
        for &(rarity, weight) in table.entries() {
            let reached = (sum + weight).min(DRAW_RANGE) - sum.min(DRAW_RANGE);
            *shares.entry(rarity).or_insert(0.0) += reached / DRAW_RANGE;
            sum += weight;
        }
        shares
    }

    fn check_proportions(table: &WeightTable, rng: &mut StdRng) {
        let mut counts: HashMap<Rarity, usize> = HashMap::new();
        for _ in 0..TRIALS {
            *counts.entry(table.sample(rng)).or_default() += 1;
        }

        let present: Vec<Rarity> = table.entries().iter().map(|(r, _)| *r).collect();
        assert!(counts.keys().all(|r| present.contains(r)));

        for (rarity, share) in expected_shares(table) {
            let observed = counts.get(&rarity).copied().unwrap_or(0) as f64 / TRIALS as f64;
            assert!(
                (observed - share).abs() < 0.05,
                "{rarity:?}: expected {share}, observed {observed}"
            );
        }
    }

    #[test]
    fn test_round_proportions() {
        let rules = RoundRules::default();
        let rng = &mut StdRng::seed_from_u64(0x2b1c);
        assert_eq!(rules.rounds(), 19);
        for round in 1..=rules.rounds() {
            check_proportions(rules.round(round).unwrap(), rng);
        }
        check_proportions(rules.reroll(), rng);
        check_proportions(rules.preview(), rng);
    }

    #[test]
    fn test_sample_fixed_draws() {
        let bronze = WeightTable::new(vec![(Rarity::Bronze, 100.0)]);
        let empty = WeightTable::default();

        // Constant zero draw.
        let low = &mut StepRng::new(0, 0);
        // Constant draw just below the top of the range.
        let high = &mut StepRng::new(u64::MAX, 0);

        for rng in [low, high] {
            assert_eq!(bronze.sample(rng), Rarity::Bronze);
            assert_eq!(empty.sample(rng), Rarity::Bronze);
        }
    }

    #[test]
    fn test_sample_order_matters() {
        let table = WeightTable::new(vec![(Rarity::Gold, 50.0), (Rarity::Silver, 50.0)]);
        assert_eq!(table.sample(&mut StepRng::new(0, 0)), Rarity::Gold);
        assert_eq!(table.sample(&mut StepRng::new(u64::MAX, 0)), Rarity::Silver);
    }

    #[test]
    fn test_sample_short_table_falls_back() {
        let table = WeightTable::new(vec![(Rarity::Rainbow, 10.0)]);
        assert_eq!(table.sample(&mut StepRng::new(u64::MAX, 0)), Rarity::Bronze);
    }

    #[test]
    fn test_round_lookup() {
        let rules = RoundRules::default();
        assert!(rules.round(0).is_none());
        assert!(rules.round(20).is_none());
        assert_eq!(
            rules.round(1).unwrap().entries(),
            &[(Rarity::Bronze, 100.0)]
        );
        assert_eq!(
            rules.round(19).unwrap().entries(),
            &[(Rarity::Rainbow, 80.0), (Rarity::Gold, 20.0)]
        );
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"{
            "preview": [["虹", 100]],
            "rounds": [[["銅", 50], ["Silver", 50]], [["金", 100]]],
            "reroll": []
        }"#;
        let rules = RoundRules::from_json(json).unwrap();
        assert_eq!(rules.rounds(), 2);
        assert_eq!(
            rules.round(1).unwrap().entries(),
            &[(Rarity::Bronze, 50.0), (Rarity::Silver, 50.0)]
        );
        assert!(rules.reroll().entries().is_empty());
    }

    #[test]
    fn test_rules_validation() {
        let no_rounds = r#"{"preview": [], "rounds": [], "reroll": []}"#;
        assert!(RoundRules::from_json(no_rounds).is_err());

        let negative = r#"{"preview": [], "rounds": [[["銅", -1]]], "reroll": []}"#;
        assert!(RoundRules::from_json(negative).is_err());

        assert!(RoundRules::from_json("not json").is_err());
        assert!(RoundRules::default().validate().is_ok());
    }
}
