//! Cross-request usage tracking: which questions a session may still see,
//! when the bank counts as exhausted, and when to serve a partial batch.

use std::collections::HashSet;

use quizgen_core::model::{Question, QuestionId, QuestionPool, UsageState};
use tracing::info;

/// Result of the partial-batch check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialBatch {
    pub serve_partial: bool,
    /// Number of questions to select for this request.
    pub total: usize,
}

/// Result of the exhaustion check.
#[derive(Debug, Clone)]
pub struct Exhaustion<'a> {
    pub reset: bool,
    pub pool: Vec<&'a Question>,
}

fn is_seen(id: QuestionId, usage: &UsageState, client_used: &HashSet<QuestionId>) -> bool {
    usage.is_used(id) || client_used.contains(&id)
}

/// Questions the session has not seen yet, plus every force-included question
/// even if it was seen before.
///
/// Client-reported ids are merged with the server-side record.
#[must_use]
pub fn eligible_pool<'a>(
    pool: &'a QuestionPool,
    usage: &UsageState,
    client_used: &HashSet<QuestionId>,
    force_include: &HashSet<QuestionId>,
) -> Vec<&'a Question> {
    pool.questions()
        .iter()
        .filter(|q| force_include.contains(&q.id()) || !is_seen(q.id(), usage, client_used))
        .collect()
}

/// Number of bank questions neither the server nor the client has recorded as served.
#[must_use]
pub fn unseen_count(
    pool: &QuestionPool,
    usage: &UsageState,
    client_used: &HashSet<QuestionId>,
) -> usize {
    pool.questions()
        .iter()
        .filter(|q| !is_seen(q.id(), usage, client_used))
        .count()
}

/// Scale the request down to the unseen count when `0 < unseen < total`.
#[must_use]
pub fn check_partial_batch(unseen: usize, total: usize) -> PartialBatch {
    if unseen > 0 && unseen < total {
        PartialBatch {
            serve_partial: true,
            total: unseen,
        }
    } else {
        PartialBatch {
            serve_partial: false,
            total,
        }
    }
}

/// Reset usage when fewer than `total` questions are eligible.
///
/// On reset the whole bank becomes the selection source; otherwise the
/// eligible list is used as-is.
pub fn check_exhaustion<'a>(
    pool: &'a QuestionPool,
    eligible: Vec<&'a Question>,
    usage: &mut UsageState,
    total: usize,
) -> Exhaustion<'a> {
    if eligible.len() >= total {
        return Exhaustion {
            reset: false,
            pool: eligible,
        };
    }

    info!(
        eligible = eligible.len(),
        requested = total,
        forgotten = usage.used_ids().len(),
        "question bank exhausted, resetting usage"
    );
    usage.reset();
    Exhaustion {
        reset: true,
        pool: pool.questions().iter().collect(),
    }
}

/// Force-included ids the bank does not hold, ascending.
#[must_use]
pub fn unknown_ids(pool: &QuestionPool, ids: &HashSet<QuestionId>) -> Vec<QuestionId> {
    let mut unknown: Vec<_> = ids.iter().copied().filter(|&id| !pool.contains(id)).collect();
    unknown.sort_unstable();
    unknown
}

/// Record served ids. Returns how many were new to the session.
pub fn record_served(usage: &mut UsageState, ids: impl IntoIterator<Item = QuestionId>) -> usize {
    ids.into_iter().filter(|&id| usage.mark_used(id)).count()
}
