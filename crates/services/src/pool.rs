use std::sync::{Arc, PoisonError, RwLock};

use quizgen_core::model::QuestionPool;
use storage::repository::QuestionSource;
use tracing::info;

use crate::error::PoolLoadError;

/// Holds the current question pool snapshot.
///
/// Readers clone the `Arc` and keep using their snapshot for the whole
/// request; a reload swaps in a new pool without touching the old one.
#[derive(Debug, Default)]
pub struct PoolHandle {
    current: RwLock<Arc<QuestionPool>>,
}

impl PoolHandle {
    #[must_use]
    pub fn new(pool: QuestionPool) -> Self {
        Self {
            current: RwLock::new(Arc::new(pool)),
        }
    }

    /// Build a handle from whatever the source currently holds.
    ///
    /// # Errors
    ///
    /// Returns `PoolLoadError` if the source cannot be read or holds duplicate ids.
    pub async fn load(source: &dyn QuestionSource) -> Result<Self, PoolLoadError> {
        let pool = QuestionPool::new(source.load_questions().await?)?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<QuestionPool> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install a new snapshot, returning the previous one.
    pub fn replace(&self, pool: QuestionPool) -> Arc<QuestionPool> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(pool))
    }

    /// Reload from `source` and swap the snapshot. Returns the new pool size.
    ///
    /// On failure the current snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns `PoolLoadError` if the source cannot be read or holds duplicate ids.
    pub async fn reload(&self, source: &dyn QuestionSource) -> Result<usize, PoolLoadError> {
        let pool = QuestionPool::new(source.load_questions().await?)?;
        let size = pool.len();
        let previous = self.replace(pool);
        info!(previous = previous.len(), current = size, "question pool reloaded");
        Ok(size)
    }
}
