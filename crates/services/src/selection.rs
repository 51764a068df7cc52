//! Quota-constrained question selection.
//!
//! The pool is shuffled once, then scanned left to right by four passes in
//! fixed order, each skipping questions already chosen:
//!
//! 1. forced: retest ids are taken unconditionally, consuming whatever quota
//!    slots they happen to fit;
//! 2. exact: category, difficulty and type must all have budget;
//! 3. Medium→Hard: while Medium budget remains, Hard questions that fit the
//!    category and type quotas fill Medium slots;
//! 4. relaxed: any single matching dimension is enough; while Medium budget
//!    remains, non-Medium candidates fill the Medium slot.
//!
//! Selection stops once `total` questions are chosen. Running out of
//! candidates first is a normal outcome.

use std::collections::{BTreeMap, HashSet};

use quizgen_core::model::{Difficulty, Dimension, Question, QuestionId, QuotaPlan};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

const MEDIUM: &str = "Medium";

/// One value of `T` per quota dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PerDimension<T> {
    pub category: T,
    pub difficulty: T,
    #[serde(rename = "type")]
    pub kind: T,
}

impl<T> PerDimension<T> {
    #[must_use]
    pub fn get(&self, dim: Dimension) -> &T {
        match dim {
            Dimension::Category => &self.category,
            Dimension::Difficulty => &self.difficulty,
            Dimension::Type => &self.kind,
        }
    }

    pub fn get_mut(&mut self, dim: Dimension) -> &mut T {
        match dim {
            Dimension::Category => &mut self.category,
            Dimension::Difficulty => &mut self.difficulty,
            Dimension::Type => &mut self.kind,
        }
    }
}

/// Value → number of selected questions carrying it.
pub type AttributeCounts = PerDimension<BTreeMap<String, u32>>;

/// Requested value → values actually used in its place, in selection order.
pub type SubstitutionLog = PerDimension<BTreeMap<String, Vec<String>>>;

/// Which pass chose a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPass {
    Forced,
    Exact,
    MediumSubstitution,
    Relaxed,
}

impl SelectionPass {
    /// Picks made after the exact pass only partially honour the quotas.
    #[must_use]
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::MediumSubstitution | Self::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick<'a> {
    pub question: &'a Question,
    pub pass: SelectionPass,
    /// A substitution was recorded when this question was taken.
    pub substituted: bool,
}

/// Outcome of one selection run.
#[derive(Debug, Clone)]
pub struct SelectionResult<'a> {
    pub selected: Vec<Pick<'a>>,
    pub remaining: QuotaPlan,
    pub actual: AttributeCounts,
    pub substitutions: SubstitutionLog,
}

impl SelectionResult<'_> {
    pub fn ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.selected.iter().map(|p| p.question.id())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Working state shared by the passes.
struct Selection<'a> {
    total: usize,
    chosen: HashSet<QuestionId>,
    result: SelectionResult<'a>,
}

impl<'a> Selection<'a> {
    /// `candidates` bounds the buffers; `total` is client-controlled.
    fn new(plan: &QuotaPlan, total: usize, candidates: usize) -> Self {
        let capacity = total.min(candidates);
        Self {
            total,
            chosen: HashSet::with_capacity(capacity),
            result: SelectionResult {
                selected: Vec::with_capacity(capacity),
                remaining: plan.clone(),
                actual: AttributeCounts::default(),
                substitutions: SubstitutionLog::default(),
            },
        }
    }

    fn is_full(&self) -> bool {
        self.result.selected.len() >= self.total
    }

    fn contains(&self, q: &Question) -> bool {
        self.chosen.contains(&q.id())
    }

    fn budget(&self, dim: Dimension, value: &str) -> bool {
        self.result.remaining.has_budget(dim, value)
    }

    fn take(&mut self, dim: Dimension, value: &str) -> bool {
        self.result.remaining.take(dim, value)
    }

    fn substitute(&mut self, dim: Dimension, requested: &str, used: &str) {
        self.result
            .substitutions
            .get_mut(dim)
            .entry(requested.to_owned())
            .or_default()
            .push(used.to_owned());
    }

    fn push(&mut self, question: &'a Question, pass: SelectionPass, substituted: bool) {
        debug_assert!(!self.contains(question), "question selected twice");
        self.chosen.insert(question.id());
        for dim in Dimension::ALL {
            *self
                .result
                .actual
                .get_mut(dim)
                .entry(question.attribute(dim).to_owned())
                .or_insert(0) += 1;
        }
        self.result.selected.push(Pick {
            question,
            pass,
            substituted,
        });
    }

    fn forced_pass(&mut self, order: &[&'a Question], force_include: &HashSet<QuestionId>) {
        if force_include.is_empty() {
            return;
        }
        for &q in order {
            if self.is_full() {
                break;
            }
            if !force_include.contains(&q.id()) || self.contains(q) {
                continue;
            }
            for dim in Dimension::ALL {
                self.take(dim, q.attribute(dim));
            }
            self.push(q, SelectionPass::Forced, false);
        }
    }

    fn exact_pass(&mut self, order: &[&'a Question]) {
        for &q in order {
            if self.is_full() {
                break;
            }
            if self.contains(q) {
                continue;
            }
            if Dimension::ALL
                .iter()
                .all(|&dim| self.budget(dim, q.attribute(dim)))
            {
                for dim in Dimension::ALL {
                    self.take(dim, q.attribute(dim));
                }
                self.push(q, SelectionPass::Exact, false);
            }
        }
    }

    fn medium_substitution_pass(&mut self, order: &[&'a Question]) {
        for &q in order {
            if self.is_full() || !self.budget(Dimension::Difficulty, MEDIUM) {
                break;
            }
            if self.contains(q) || q.difficulty() != Difficulty::Hard {
                continue;
            }
            if self.budget(Dimension::Category, q.category()) && self.budget(Dimension::Type, q.kind())
            {
                self.take(Dimension::Category, q.category());
                self.take(Dimension::Type, q.kind());
                self.take(Dimension::Difficulty, MEDIUM);
                self.substitute(Dimension::Difficulty, MEDIUM, Difficulty::Hard.as_str());
                self.push(q, SelectionPass::MediumSubstitution, true);
            }
        }
    }

    fn relaxed_pass(&mut self, order: &[&'a Question]) {
        for &q in order {
            if self.is_full() {
                break;
            }
            if self.contains(q) {
                continue;
            }

            let category = self.budget(Dimension::Category, q.category());
            let kind = self.budget(Dimension::Type, q.kind());
            let fills_medium =
                q.difficulty() != Difficulty::Medium && self.budget(Dimension::Difficulty, MEDIUM);
            let own_difficulty = self.budget(Dimension::Difficulty, q.difficulty().as_str());
            if !(category || kind || fills_medium || own_difficulty) {
                continue;
            }

            if category {
                self.take(Dimension::Category, q.category());
            }
            if kind {
                self.take(Dimension::Type, q.kind());
            }
            let substituted = if fills_medium {
                self.take(Dimension::Difficulty, MEDIUM);
                self.substitute(Dimension::Difficulty, MEDIUM, q.difficulty().as_str());
                true
            } else {
                if own_difficulty {
                    self.take(Dimension::Difficulty, q.difficulty().as_str());
                }
                false
            };
            self.push(q, SelectionPass::Relaxed, substituted);
        }
    }
}

/// Selects up to `total` questions from a pool under a quota plan.
pub struct SelectionEngine<'p> {
    plan: &'p QuotaPlan,
    force_include: &'p HashSet<QuestionId>,
    total: usize,
}

impl<'p> SelectionEngine<'p> {
    #[must_use]
    pub fn new(plan: &'p QuotaPlan, force_include: &'p HashSet<QuestionId>, total: usize) -> Self {
        Self {
            plan,
            force_include,
            total,
        }
    }

    /// Run the selection passes over `pool`.
    ///
    /// `rng` is used once, to shuffle the pool before scanning.
    pub fn select<'a, R>(&self, pool: &[&'a Question], rng: &mut R) -> SelectionResult<'a>
    where
        R: Rng + ?Sized,
    {
        let mut order = pool.to_vec();
        order.shuffle(rng);

        let mut selection = Selection::new(self.plan, self.total, order.len());
        selection.forced_pass(&order, self.force_include);
        selection.exact_pass(&order);
        if !selection.is_full() && selection.budget(Dimension::Difficulty, MEDIUM) {
            selection.medium_substitution_pass(&order);
        }
        selection.relaxed_pass(&order);

        debug!(
            requested = self.total,
            candidates = order.len(),
            selected = selection.result.selected.len(),
            "selection finished"
        );
        selection.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(id: u64, category: &str, difficulty: Difficulty, kind: &str) -> Question {
        Question::new(QuestionId::new(id), format!("Q{id}"), category, difficulty, kind).unwrap()
    }

    /// Ten questions spread across A/B, Easy/Medium/Hard, MCQ/Short.
    fn balanced_pool() -> Vec<Question> {
        let difficulties = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
        (0..10u64)
            .map(|i| {
                let category = if i % 2 == 0 { "A" } else { "B" };
                let kind = if i < 5 { "MCQ" } else { "Short" };
                let difficulty = difficulties[usize::try_from(i % 3).unwrap()];
                question(i + 1, category, difficulty, kind)
            })
            .collect()
    }

    fn standard_plan() -> QuotaPlan {
        QuotaPlan::new(
            [("A", 3), ("B", 2)],
            [("Easy", 2), ("Medium", 2), ("Hard", 1)],
            [("MCQ", 3), ("Short", 2)],
        )
    }

    fn refs(pool: &[Question]) -> Vec<&Question> {
        pool.iter().collect()
    }

    fn assert_consistent(result: &SelectionResult<'_>, total: usize) {
        assert!(result.len() <= total);
        let unique: HashSet<_> = result.ids().collect();
        assert_eq!(unique.len(), result.len(), "duplicate ids selected");
        for dim in Dimension::ALL {
            let sum: u32 = result.actual.get(dim).values().sum();
            assert_eq!(sum as usize, result.len(), "actual counts for {dim}");
        }
    }

    #[test]
    fn fills_balanced_request_for_many_seeds() {
        let pool = balanced_pool();
        let plan = standard_plan();
        let force = HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = SelectionEngine::new(&plan, &force, 5).select(&refs(&pool), &mut rng);
            assert_eq!(result.len(), 5, "seed {seed}");
            assert_consistent(&result, 5);
        }
    }

    #[test]
    fn same_seed_gives_same_selection() {
        let pool = balanced_pool();
        let plan = standard_plan();
        let force = HashSet::new();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            SelectionEngine::new(&plan, &force, 5)
                .select(&refs(&pool), &mut rng)
                .ids()
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn exact_matches_are_preferred_when_available() {
        let pool = vec![
            question(1, "A", Difficulty::Easy, "MCQ"),
            question(2, "B", Difficulty::Hard, "Short"),
            question(3, "A", Difficulty::Hard, "Short"),
        ];
        let plan = QuotaPlan::new([("A", 1)], [("Easy", 1)], [("MCQ", 1)]);
        let force = HashSet::new();
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = SelectionEngine::new(&plan, &force, 1).select(&refs(&pool), &mut rng);
            assert_eq!(result.len(), 1);
            assert_eq!(result.selected[0].question.id(), QuestionId::new(1));
            assert_eq!(result.selected[0].pass, SelectionPass::Exact);
            assert!(result.substitutions.difficulty.is_empty());
        }
    }

    #[test]
    fn forced_ids_always_selected() {
        let pool = balanced_pool();
        let plan = standard_plan();
        let force: HashSet<_> = [QuestionId::new(2), QuestionId::new(9)].into_iter().collect();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = SelectionEngine::new(&plan, &force, 5).select(&refs(&pool), &mut rng);
            assert_consistent(&result, 5);
            for id in &force {
                let pick = result
                    .selected
                    .iter()
                    .find(|p| p.question.id() == *id)
                    .expect("forced id selected");
                assert_eq!(pick.pass, SelectionPass::Forced);
                assert!(!pick.substituted);
            }
        }
    }

    #[test]
    fn forced_picks_respect_total() {
        let pool = balanced_pool();
        let plan = standard_plan();
        let force: HashSet<_> = (1..=10).map(QuestionId::new).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let result = SelectionEngine::new(&plan, &force, 5).select(&refs(&pool), &mut rng);
        assert_eq!(result.len(), 5);
        assert!(result.selected.iter().all(|p| p.pass == SelectionPass::Forced));
    }

    #[test]
    fn forced_pick_only_consumes_slots_with_budget() {
        let pool = vec![question(1, "Z", Difficulty::Easy, "Essay")];
        let plan = QuotaPlan::new([("A", 1)], [("Easy", 1)], [("MCQ", 1)]);
        let force: HashSet<_> = [QuestionId::new(1)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(0);
        let result = SelectionEngine::new(&plan, &force, 1).select(&refs(&pool), &mut rng);
        assert_eq!(result.len(), 1);
        assert_eq!(result.remaining.get(Dimension::Difficulty, "Easy"), 0);
        assert_eq!(result.remaining.get(Dimension::Category, "A"), 1);
        assert_eq!(result.remaining.get(Dimension::Type, "MCQ"), 1);
    }

    #[test]
    fn hard_substitutes_for_missing_medium() {
        let pool = vec![
            question(1, "A", Difficulty::Hard, "MCQ"),
            question(2, "A", Difficulty::Hard, "MCQ"),
            question(3, "B", Difficulty::Easy, "Short"),
        ];
        let plan = QuotaPlan::new([("A", 2)], [("Medium", 2)], [("MCQ", 2)]);
        let force = HashSet::new();
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = SelectionEngine::new(&plan, &force, 2).select(&refs(&pool), &mut rng);
            assert_eq!(result.len(), 2);
            assert!(result.selected.iter().all(|p| {
                p.question.difficulty() == Difficulty::Hard
                    && p.pass == SelectionPass::MediumSubstitution
                    && p.substituted
            }));
            assert_eq!(
                result.substitutions.difficulty.get("Medium"),
                Some(&vec!["Hard".to_owned(), "Hard".to_owned()])
            );
            assert_eq!(result.actual.difficulty.get("Hard"), Some(&2));
            assert_eq!(result.remaining.get(Dimension::Difficulty, "Medium"), 0);
        }
    }

    #[test]
    fn relaxed_pass_fills_medium_with_any_difficulty() {
        // No Hard question fits category+type, so Easy ends up in the Medium slot.
        let pool = vec![question(1, "B", Difficulty::Easy, "Short")];
        let plan = QuotaPlan::new([("A", 1)], [("Medium", 1)], [("MCQ", 1)]);
        let force = HashSet::new();
        let mut rng = StdRng::seed_from_u64(0);
        let result = SelectionEngine::new(&plan, &force, 1).select(&refs(&pool), &mut rng);

        assert_eq!(result.len(), 1);
        let pick = result.selected[0];
        assert_eq!(pick.pass, SelectionPass::Relaxed);
        assert!(pick.substituted);
        assert_eq!(
            result.substitutions.difficulty.get("Medium"),
            Some(&vec!["Easy".to_owned()])
        );
        // Unmatched dimensions keep their budget.
        assert_eq!(result.remaining.get(Dimension::Category, "A"), 1);
    }

    #[test]
    fn relaxed_pass_requires_some_matching_dimension() {
        let pool = vec![question(1, "Z", Difficulty::Hard, "Essay")];
        let plan = QuotaPlan::new([("A", 1)], [("Easy", 1)], [("MCQ", 1)]);
        let force = HashSet::new();
        let mut rng = StdRng::seed_from_u64(0);
        let result = SelectionEngine::new(&plan, &force, 1).select(&refs(&pool), &mut rng);
        assert!(result.is_empty());
        assert_consistent(&result, 1);
    }

    #[test]
    fn underfill_is_not_an_error() {
        let pool = balanced_pool();
        let plan = QuotaPlan::new([("A", 20)], [("Easy", 20)], [("MCQ", 20)]);
        let force = HashSet::new();
        let mut rng = StdRng::seed_from_u64(11);
        let result = SelectionEngine::new(&plan, &force, 20).select(&refs(&pool), &mut rng);
        assert!(result.len() < 20);
        assert_consistent(&result, 20);
    }

    #[test]
    fn oversized_total_is_bounded_by_the_pool() {
        let pool = balanced_pool();
        let max = u32::MAX;
        let plan = QuotaPlan::new(
            [("A", max), ("B", max)],
            [("Easy", max)],
            [("MCQ", max)],
        );
        let force = HashSet::new();
        let total = usize::try_from(max).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let result = SelectionEngine::new(&plan, &force, total).select(&refs(&pool), &mut rng);
        assert_eq!(result.len(), pool.len());
        assert_consistent(&result, total);
    }

    #[test]
    fn empty_pool_selects_nothing() {
        let plan = standard_plan();
        let force = HashSet::new();
        let mut rng = StdRng::seed_from_u64(0);
        let result = SelectionEngine::new(&plan, &force, 5).select(&[], &mut rng);
        assert!(result.is_empty());
    }
}
