use crate::DbPool;

const CREATE_USERS: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id                 INTEGER PRIMARY KEY,
    display_name       TEXT,
    handle             TEXT,
    joined_at          TEXT NOT NULL,
    terms_accepted     INTEGER NOT NULL DEFAULT 0,
    terms_accepted_at  TEXT,
    channel_verified   INTEGER NOT NULL DEFAULT 0,
    banned             INTEGER NOT NULL DEFAULT 0,
    banned_at          TEXT,
    search_count       INTEGER NOT NULL DEFAULT 0,
    last_activity_at   TEXT,
    last_activity_kind TEXT
)";

const CREATE_ELIGIBLE_IDX: &str =
    "CREATE INDEX IF NOT EXISTS idx_users_terms_accepted ON users(terms_accepted)";

/// Bring the schema up at startup; idempotent.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_USERS).execute(pool).await?;
    sqlx::query(CREATE_ELIGIBLE_IDX).execute(pool).await?;
    Ok(())
}
