use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::model::ids::QuestionId;

/// Per-session record of which questions have already been served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageState {
    used_ids: BTreeSet<QuestionId>,
    exhausted: bool,
    last_seen: DateTime<Utc>,
}

impl UsageState {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            used_ids: BTreeSet::new(),
            exhausted: false,
            last_seen: now,
        }
    }

    /// Rebuilds a state from persisted parts.
    #[must_use]
    pub fn from_persisted(
        used_ids: impl IntoIterator<Item = QuestionId>,
        exhausted: bool,
        last_seen: DateTime<Utc>,
    ) -> Self {
        Self {
            used_ids: used_ids.into_iter().collect(),
            exhausted,
            last_seen,
        }
    }

    #[must_use]
    pub fn used_ids(&self) -> &BTreeSet<QuestionId> {
        &self.used_ids
    }

    #[must_use]
    pub fn is_used(&self, id: QuestionId) -> bool {
        self.used_ids.contains(&id)
    }

    /// True only for the response in which the bank was reset.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Starts a new request: the exhaustion flag does not outlive the response
    /// that raised it.
    pub fn begin_request(&mut self, now: DateTime<Utc>) {
        self.exhausted = false;
        self.last_seen = now;
    }

    /// Records an id as served. Returns false if it was already recorded.
    pub fn mark_used(&mut self, id: QuestionId) -> bool {
        self.used_ids.insert(id)
    }

    /// Forgets every served id and flags the reset for this response.
    pub fn reset(&mut self) {
        self.used_ids.clear();
        self.exhausted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn mark_used_is_idempotent() {
        let mut usage = UsageState::new(fixed_now());
        assert!(usage.mark_used(QuestionId::new(1)));
        assert!(!usage.mark_used(QuestionId::new(1)));
        assert_eq!(usage.used_ids().len(), 1);
    }

    #[test]
    fn reset_flag_lasts_one_request() {
        let mut usage = UsageState::new(fixed_now());
        usage.mark_used(QuestionId::new(1));
        usage.reset();
        assert!(usage.exhausted());
        assert!(usage.used_ids().is_empty());

        usage.begin_request(fixed_now());
        assert!(!usage.exhausted());
    }
}
