use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::SqliteInitError;

const CREATE_QUESTIONS: &str = r"
    CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY,
        question TEXT NOT NULL,
        category TEXT NOT NULL,
        difficulty TEXT NOT NULL CHECK (difficulty IN ('Easy', 'Medium', 'Hard')),
        type TEXT NOT NULL
    );
";

const CREATE_USAGE_SESSIONS: &str = r"
    CREATE TABLE IF NOT EXISTS usage_sessions (
        session_id TEXT PRIMARY KEY,
        exhausted INTEGER NOT NULL CHECK (exhausted IN (0, 1)),
        last_seen TEXT NOT NULL
    );
";

const CREATE_USAGE_SERVED: &str = r"
    CREATE TABLE IF NOT EXISTS usage_served (
        session_id TEXT NOT NULL,
        question_id INTEGER NOT NULL,
        PRIMARY KEY (session_id, question_id),
        FOREIGN KEY (session_id) REFERENCES usage_sessions(session_id) ON DELETE CASCADE
    );
";

const INDEX_USAGE_LAST_SEEN: &str = r"
    CREATE INDEX IF NOT EXISTS idx_usage_sessions_last_seen
        ON usage_sessions (last_seen);
";

/// Schema versions in application order.
const MIGRATIONS: &[(i64, &[&str])] = &[(
    1,
    &[
        CREATE_QUESTIONS,
        CREATE_USAGE_SESSIONS,
        CREATE_USAGE_SERVED,
        INDEX_USAGE_LAST_SEEN,
    ],
)];

async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
        .bind(version)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Runs the schema migrations in order, skipping versions already recorded.
///
/// Each version is applied in its own transaction together with its
/// `schema_migrations` row.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
        ",
    )
    .execute(pool)
    .await?;

    for &(version, statements) in MIGRATIONS {
        if is_applied(pool, version).await? {
            continue;
        }

        let mut tx = pool.begin().await?;
        for &statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)
             ON CONFLICT(version) DO NOTHING",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(version, "applied schema migration");
    }

    Ok(())
}
