use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use nsb_core::{
    domain::{ActivityKind, UserId, UserRecord},
    errors::Error,
    store::{StoreStats, UserStore},
    Result,
};

use crate::DbPool;

/// `UserStore` over the SQLite users table.
pub struct SqlUserStore {
    pool: DbPool,
}

impl SqlUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord> {
    let kind = row
        .try_get::<Option<String>, _>("last_activity_kind")
        .map_err(store_err)?
        .as_deref()
        .and_then(ActivityKind::parse);

    Ok(UserRecord {
        id: UserId(row.try_get("id").map_err(store_err)?),
        display_name: row.try_get("display_name").map_err(store_err)?,
        handle: row.try_get("handle").map_err(store_err)?,
        joined_at: row
            .try_get::<DateTime<Utc>, _>("joined_at")
            .map_err(store_err)?,
        terms_accepted: row.try_get("terms_accepted").map_err(store_err)?,
        terms_accepted_at: row
            .try_get::<Option<DateTime<Utc>>, _>("terms_accepted_at")
            .map_err(store_err)?,
        channel_verified: row.try_get("channel_verified").map_err(store_err)?,
        banned: row.try_get("banned").map_err(store_err)?,
        banned_at: row
            .try_get::<Option<DateTime<Utc>>, _>("banned_at")
            .map_err(store_err)?,
        search_count: row.try_get::<i64, _>("search_count").map_err(store_err)?.max(0) as u64,
        last_activity_at: row
            .try_get::<Option<DateTime<Utc>>, _>("last_activity_at")
            .map_err(store_err)?,
        last_activity_kind: kind,
    })
}

const SELECT_COLUMNS: &str = "\
SELECT id, display_name, handle, joined_at, terms_accepted, terms_accepted_at,
       channel_verified, banned, banned_at, search_count, last_activity_at,
       last_activity_kind
  FROM users";

#[async_trait]
impl UserStore for SqlUserStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn find(&self, id: UserId) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn upsert(&self, record: &UserRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, display_name, handle, joined_at, terms_accepted,
                                terms_accepted_at, channel_verified, banned, banned_at,
                                search_count, last_activity_at, last_activity_kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                handle = excluded.handle,
                joined_at = excluded.joined_at,
                terms_accepted = excluded.terms_accepted,
                terms_accepted_at = excluded.terms_accepted_at,
                channel_verified = excluded.channel_verified,
                banned = excluded.banned,
                banned_at = excluded.banned_at,
                search_count = excluded.search_count,
                last_activity_at = excluded.last_activity_at,
                last_activity_kind = excluded.last_activity_kind",
        )
        .bind(record.id.0)
        .bind(record.display_name.as_deref())
        .bind(record.handle.as_deref())
        .bind(record.joined_at)
        .bind(record.terms_accepted)
        .bind(record.terms_accepted_at)
        .bind(record.channel_verified)
        .bind(record.banned)
        .bind(record.banned_at)
        .bind(record.search_count as i64)
        .bind(record.last_activity_at)
        .bind(record.last_activity_kind.map(|k| k.as_str()))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn list_eligible(&self) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE terms_accepted = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(terms_accepted), 0) AS accepted,
                    COALESCE(SUM(search_count), 0) AS searches
               FROM users",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(StoreStats {
            total_users: row.try_get::<i64, _>("total").map_err(store_err)?.max(0) as u64,
            accepted_users: row.try_get::<i64, _>("accepted").map_err(store_err)?.max(0) as u64,
            total_searches: row.try_get::<i64, _>("searches").map_err(store_err)?.max(0) as u64,
        })
    }
}
