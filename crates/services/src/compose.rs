//! Turns a selection into the client payload, explaining every shortfall.

use std::collections::BTreeMap;

use quizgen_core::model::{Dimension, QuestionId, QuotaPlan};
use serde::Serialize;

use crate::selection::{SelectionPass, SelectionResult, SubstitutionLog};

const RESET_MESSAGE: &str = "All questions in the bank have been used. \
Your question history was reset, so questions may repeat.";

/// One question of a generated test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestItem {
    pub id: QuestionId,
    pub question: String,
    pub category: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_fallback: bool,
    pub was_substituted: bool,
}

/// Response body of a test generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedTest {
    pub test: Vec<TestItem>,
    pub messages: Vec<String>,
    pub adjustments: Vec<String>,
    pub reset_question_bank: bool,
    pub reset_message: Option<String>,
    pub partial_batch: bool,
    pub substitutions: SubstitutionLog,
}

/// Request-level facts the composer reports alongside the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeContext {
    /// `total_questions` as the client asked.
    pub requested_total: usize,
    /// Number actually aimed for (lower in partial-batch mode).
    pub target_total: usize,
    pub partial_batch: bool,
    pub reset: bool,
}

/// Most frequent entry; ties go to whichever appeared first.
fn most_frequent(values: &[String]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for v in values {
        match counts.iter_mut().find(|(seen, _)| *seen == v.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((v.as_str(), 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value)
}

/// Other value of the dimension that was served the most (ties by name).
fn provided_instead<'r>(actual: &'r BTreeMap<String, u32>, requested: &str) -> Option<&'r str> {
    let mut best: Option<(&str, u32)> = None;
    for (value, &n) in actual {
        if value == requested || n == 0 {
            continue;
        }
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((value.as_str(), n));
        }
    }
    best.map(|(value, _)| value)
}

fn shortfall_messages(plan: &QuotaPlan, result: &SelectionResult<'_>) -> Vec<String> {
    let mut messages = Vec::new();
    for dim in Dimension::ALL {
        let actual = result.actual.get(dim);
        let substitutions = result.substitutions.get(dim);
        for (value, &requested) in plan.counts(dim) {
            let got = actual.get(value).copied().unwrap_or(0);
            if got >= requested {
                continue;
            }
            let head = format!(
                "Requested {requested} {dim} '{value}' question(s), but only {got} available"
            );
            let substitute = substitutions
                .get(value)
                .and_then(|used| most_frequent(used));
            let message = if let Some(sub) = substitute {
                format!("{head}; used '{sub}' instead.")
            } else if let Some(other) = provided_instead(actual, value) {
                format!("{head}; '{other}' provided instead.")
            } else {
                format!("{head}.")
            };
            messages.push(message);
        }
    }
    messages
}

fn substitution_adjustments(log: &SubstitutionLog) -> Vec<String> {
    let mut out = Vec::new();
    for dim in Dimension::ALL {
        for (requested, used) in log.get(dim) {
            let mut tally: Vec<(&str, usize)> = Vec::new();
            for v in used {
                match tally.iter_mut().find(|(seen, _)| *seen == v.as_str()) {
                    Some((_, n)) => *n += 1,
                    None => tally.push((v.as_str(), 1)),
                }
            }
            for (value, n) in tally {
                out.push(format!(
                    "{n} {requested} {dim} slot(s) filled with '{value}' questions."
                ));
            }
        }
    }
    out
}

/// Build the client payload for a finished selection.
#[must_use]
pub fn compose(plan: &QuotaPlan, result: &SelectionResult<'_>, ctx: ComposeContext) -> GeneratedTest {
    let test = result
        .selected
        .iter()
        .map(|pick| TestItem {
            id: pick.question.id(),
            question: pick.question.text().to_owned(),
            category: pick.question.category().to_owned(),
            difficulty: pick.question.difficulty().as_str().to_owned(),
            kind: pick.question.kind().to_owned(),
            is_fallback: pick.pass.is_fallback(),
            was_substituted: pick.substituted,
        })
        .collect::<Vec<_>>();

    let mut messages = shortfall_messages(plan, result);
    if test.len() < ctx.target_total {
        messages.push(format!(
            "Only {} of {} requested question(s) could be selected.",
            test.len(),
            ctx.target_total
        ));
    }

    let mut adjustments = Vec::new();
    if ctx.partial_batch {
        adjustments.push(format!(
            "Only {} unseen question(s) remain; serving a partial batch of {} instead of {}.",
            ctx.target_total,
            ctx.target_total,
            ctx.requested_total
        ));
    }
    let forced = result
        .selected
        .iter()
        .filter(|p| p.pass == SelectionPass::Forced)
        .count();
    if forced > 0 {
        adjustments.push(format!(
            "{forced} previously missed question(s) included for retest."
        ));
    }
    adjustments.extend(substitution_adjustments(&result.substitutions));

    GeneratedTest {
        test,
        messages,
        adjustments,
        reset_question_bank: ctx.reset,
        reset_message: ctx.reset.then(|| RESET_MESSAGE.to_owned()),
        partial_batch: ctx.partial_batch,
        substitutions: result.substitutions.clone(),
    }
}

/// Tell the client which retest ids could not be honoured.
pub fn note_unknown_forced(test: &mut GeneratedTest, unknown: &[QuestionId]) {
    if unknown.is_empty() {
        return;
    }
    let listed = unknown
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    test.messages.push(format!(
        "{} requested retest question(s) not found in the bank: {listed}.",
        unknown.len()
    ));
}
