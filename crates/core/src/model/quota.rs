use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::question::{Difficulty, Dimension, normalize_label};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuotaError {
    #[error("total_questions must be > 0")]
    ZeroTotal,

    #[error("{dimension} counts sum to {sum}, but total_questions is {total}")]
    Mismatch {
        dimension: Dimension,
        sum: u64,
        total: u32,
    },
}

//
// ─── QUOTA PLAN ────────────────────────────────────────────────────────────────
//

/// Requested question counts per attribute value, for each dimension.
///
/// Also serves as the engine's working copy: [`QuotaPlan::take`] decrements a
/// slot and never goes below zero. Values absent from a mapping simply have no
/// budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaPlan {
    category: BTreeMap<String, u32>,
    difficulty: BTreeMap<String, u32>,
    kind: BTreeMap<String, u32>,
}

fn collect_counts<I, K>(entries: I, canonical: impl Fn(&str) -> String) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = (K, u32)>,
    K: AsRef<str>,
{
    let mut out = BTreeMap::new();
    for (key, count) in entries {
        let slot = out.entry(canonical(key.as_ref())).or_insert(0u32);
        *slot = slot.saturating_add(count);
    }
    out
}

fn canonical_difficulty(raw: &str) -> String {
    raw.parse::<Difficulty>()
        .map_or_else(|_| normalize_label(raw), |d| d.as_str().to_owned())
}

impl QuotaPlan {
    /// Builds a plan from raw request mappings.
    ///
    /// Labels are trimmed; difficulty labels that parse are canonicalized
    /// (`"medium"` becomes `"Medium"`). Keys that collapse onto the same label
    /// have their counts added.
    #[must_use]
    pub fn new<C, D, T, KC, KD, KT>(category: C, difficulty: D, kind: T) -> Self
    where
        C: IntoIterator<Item = (KC, u32)>,
        D: IntoIterator<Item = (KD, u32)>,
        T: IntoIterator<Item = (KT, u32)>,
        KC: AsRef<str>,
        KD: AsRef<str>,
        KT: AsRef<str>,
    {
        Self {
            category: collect_counts(category, normalize_label),
            difficulty: collect_counts(difficulty, canonical_difficulty),
            kind: collect_counts(kind, normalize_label),
        }
    }

    /// Value → count mapping for one dimension.
    #[must_use]
    pub fn counts(&self, dim: Dimension) -> &BTreeMap<String, u32> {
        match dim {
            Dimension::Category => &self.category,
            Dimension::Difficulty => &self.difficulty,
            Dimension::Type => &self.kind,
        }
    }

    fn counts_mut(&mut self, dim: Dimension) -> &mut BTreeMap<String, u32> {
        match dim {
            Dimension::Category => &mut self.category,
            Dimension::Difficulty => &mut self.difficulty,
            Dimension::Type => &mut self.kind,
        }
    }

    /// Remaining count for `value` in `dim` (zero when unknown).
    #[must_use]
    pub fn get(&self, dim: Dimension, value: &str) -> u32 {
        self.counts(dim).get(value).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_budget(&self, dim: Dimension, value: &str) -> bool {
        self.get(dim, value) > 0
    }

    /// Decrements the slot if it still has budget. Returns whether it did.
    pub fn take(&mut self, dim: Dimension, value: &str) -> bool {
        match self.counts_mut(dim).get_mut(value) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn sum(&self, dim: Dimension) -> u64 {
        self.counts(dim).values().map(|&c| u64::from(c)).sum()
    }

    /// Checks that every dimension sums to `total`.
    ///
    /// With `allow_partial` (partial-batch mode) the sums are not checked.
    ///
    /// # Errors
    ///
    /// Returns `QuotaError::ZeroTotal` for an empty request and
    /// `QuotaError::Mismatch` naming the first dimension that does not add up.
    pub fn validate(&self, total: u32, allow_partial: bool) -> Result<(), QuotaError> {
        if total == 0 {
            return Err(QuotaError::ZeroTotal);
        }
        if allow_partial {
            return Ok(());
        }
        for dimension in Dimension::ALL {
            let sum = self.sum(dimension);
            if sum != u64::from(total) {
                return Err(QuotaError::Mismatch {
                    dimension,
                    sum,
                    total,
                });
            }
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> QuotaPlan {
        QuotaPlan::new(
            [("A", 3), ("B", 2)],
            [("Easy", 2), ("medium", 2), ("Hard", 1)],
            [("MCQ", 3), ("Short", 2)],
        )
    }

    #[test]
    fn canonicalizes_difficulty_keys() {
        let plan = plan();
        assert_eq!(plan.get(Dimension::Difficulty, "Medium"), 2);
        assert_eq!(plan.get(Dimension::Difficulty, "medium"), 0);
    }

    #[test]
    fn merges_keys_that_normalize_to_the_same_label() {
        let plan = QuotaPlan::new([("A", 1), (" A ", 2)], [("Easy", 3)], [("MCQ", 3)]);
        assert_eq!(plan.get(Dimension::Category, "A"), 3);
        assert!(plan.validate(3, false).is_ok());
    }

    #[test]
    fn unknown_values_are_unmatchable_not_errors() {
        let plan = QuotaPlan::new([("A", 1)], [("Extreme", 1)], [("MCQ", 1)]);
        assert!(plan.validate(1, false).is_ok());
        assert!(!plan.has_budget(Dimension::Difficulty, "Hard"));
        assert!(plan.has_budget(Dimension::Difficulty, "Extreme"));
    }

    #[test]
    fn validate_accepts_matching_sums() {
        assert!(plan().validate(5, false).is_ok());
    }

    #[test]
    fn validate_names_mismatched_dimension() {
        let plan = QuotaPlan::new([("A", 5)], [("Easy", 4)], [("MCQ", 5)]);
        assert_eq!(
            plan.validate(5, false).unwrap_err(),
            QuotaError::Mismatch {
                dimension: Dimension::Difficulty,
                sum: 4,
                total: 5
            }
        );
    }

    #[test]
    fn validate_skips_sums_in_partial_mode() {
        let plan = QuotaPlan::new([("A", 5)], [("Easy", 1)], [("MCQ", 5)]);
        assert!(plan.validate(2, true).is_ok());
        assert_eq!(plan.validate(0, true).unwrap_err(), QuotaError::ZeroTotal);
    }

    #[test]
    fn take_never_goes_below_zero() {
        let mut plan = QuotaPlan::new([("A", 1)], [("Easy", 1)], [("MCQ", 1)]);
        assert!(plan.take(Dimension::Category, "A"));
        assert!(!plan.take(Dimension::Category, "A"));
        assert!(!plan.take(Dimension::Category, "Z"));
        assert_eq!(plan.get(Dimension::Category, "A"), 0);
    }
}
