use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use quizgen_core::Clock;
use quizgen_core::model::{QuestionId, QuestionPool, QuotaPlan, SessionId, UsageState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use storage::repository::UsageStore;
use tokio::sync::Mutex as SessionLock;
use tracing::{debug, info};

use crate::compose::{ComposeContext, GeneratedTest, compose, note_unknown_forced};
use crate::error::GenerateError;
use crate::selection::SelectionEngine;
use crate::usage;

/// A validated test generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub total_questions: u32,
    pub plan: QuotaPlan,
    /// Ids the client reports as already seen.
    pub used_question_ids: HashSet<QuestionId>,
    /// Ids to retest even if already seen.
    pub force_include_ids: HashSet<QuestionId>,
}

/// Builds tests for client sessions, tracking what each session has seen.
///
/// Requests for the same session are serialized: the session's usage is read,
/// updated and written back under a per-session lock, so no served id goes
/// unrecorded when a client fires requests concurrently.
pub struct TestGenerator {
    clock: Clock,
    usage: Arc<dyn UsageStore>,
    locks: Mutex<HashMap<SessionId, Arc<SessionLock<()>>>>,
}

impl TestGenerator {
    #[must_use]
    pub fn new(clock: Clock, usage: Arc<dyn UsageStore>) -> Self {
        Self {
            clock,
            usage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn session_lock(&self, session: &SessionId) -> Result<Arc<SessionLock<()>>, GenerateError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| GenerateError::Internal(e.to_string()))?;
        Ok(Arc::clone(locks.entry(session.clone()).or_default()))
    }

    /// Generate a test with an OS-seeded shuffle.
    ///
    /// # Errors
    ///
    /// See [`TestGenerator::generate_with_rng`].
    pub async fn generate(
        &self,
        session: &SessionId,
        pool: &QuestionPool,
        request: &GenerateRequest,
    ) -> Result<GeneratedTest, GenerateError> {
        let mut rng = StdRng::from_os_rng();
        self.generate_with_rng(session, pool, request, &mut rng).await
    }

    /// Generate a test for `session` from `pool`.
    ///
    /// The session's usage is only written back when generation succeeds.
    ///
    /// # Errors
    ///
    /// - `GenerateError::DataUnavailable` if the pool is empty.
    /// - `GenerateError::Validation` if the quota sums do not match the total
    ///   outside partial-batch mode.
    /// - `GenerateError::Storage` if the usage store fails.
    pub async fn generate_with_rng<R>(
        &self,
        session: &SessionId,
        pool: &QuestionPool,
        request: &GenerateRequest,
        rng: &mut R,
    ) -> Result<GeneratedTest, GenerateError>
    where
        R: Rng + Send + ?Sized,
    {
        if pool.is_empty() {
            return Err(GenerateError::DataUnavailable);
        }
        let requested_total = usize::try_from(request.total_questions)
            .map_err(|e| GenerateError::Internal(e.to_string()))?;

        let lock = self.session_lock(session)?;
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let mut state = self
            .usage
            .get(session)
            .await?
            .unwrap_or_else(|| UsageState::new(now));
        state.begin_request(now);

        let unseen = usage::unseen_count(pool, &state, &request.used_question_ids);
        let batch = usage::check_partial_batch(unseen, requested_total);
        request
            .plan
            .validate(request.total_questions, batch.serve_partial)?;
        if batch.serve_partial {
            info!(%session, unseen, requested = requested_total, "serving partial batch");
        }

        let eligible = usage::eligible_pool(
            pool,
            &state,
            &request.used_question_ids,
            &request.force_include_ids,
        );
        let source = usage::check_exhaustion(pool, eligible, &mut state, batch.total);

        let unknown_forced = usage::unknown_ids(pool, &request.force_include_ids);
        if !unknown_forced.is_empty() {
            debug!(%session, unknown = unknown_forced.len(), "force-included ids not in the bank");
        }

        let engine = SelectionEngine::new(&request.plan, &request.force_include_ids, batch.total);
        let result = engine.select(&source.pool, rng);
        let recorded = usage::record_served(&mut state, result.ids());

        self.usage.put(session, &state).await?;
        debug!(
            %session,
            selected = result.len(),
            recorded,
            used_total = state.used_ids().len(),
            reset = source.reset,
            "test generated"
        );

        let mut test = compose(
            &request.plan,
            &result,
            ComposeContext {
                requested_total,
                target_total: batch.total,
                partial_batch: batch.serve_partial,
                reset: source.reset,
            },
        );
        note_unknown_forced(&mut test, &unknown_forced);
        Ok(test)
    }

    /// Current usage record of a session, if any.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::Storage` if the usage store fails.
    pub async fn usage_of(&self, session: &SessionId) -> Result<Option<UsageState>, GenerateError> {
        Ok(self.usage.get(session).await?)
    }

    /// Forget sessions idle for longer than `ttl`. Returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::Storage` if the usage store fails.
    pub async fn evict_idle(&self, ttl: Duration) -> Result<usize, GenerateError> {
        let removed = self.usage.evict_idle(self.clock.idle_cutoff(ttl)).await?;
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| GenerateError::Internal(e.to_string()))?;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(removed)
    }
}
