use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::{CacheStore, StoredEntry};
use crate::schema::record_cache;

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = record_cache)]
struct CacheRow {
    key: String,
    value: serde_json::Value,
    written_at: i64,
}

/// Durable store backed by the `record_cache` table.
pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub fn new(pool: Pool<AsyncPgConnection>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        let mut conn = self.pool.get().await?;

        let row = record_cache::table
            .find(key)
            .select(CacheRow::as_select())
            .first::<CacheRow>(&mut conn)
            .await
            .optional()?;

        Ok(row.map(|row| StoredEntry {
            value: row.value,
            written_at: row.written_at,
        }))
    }

    #[tracing::instrument(skip(self, entry))]
    async fn save(&self, key: &str, entry: StoredEntry) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let row = CacheRow {
            key: key.to_string(),
            value: entry.value,
            written_at: entry.written_at,
        };

        diesel::insert_into(record_cache::table)
            .values(&row)
            .on_conflict(record_cache::key)
            .do_update()
            .set((
                record_cache::value.eq(excluded(record_cache::value)),
                record_cache::written_at.eq(excluded(record_cache::written_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn discard(&self, key: &str, written_at: i64) -> Result<()> {
        let mut conn = self.pool.get().await?;

        diesel::delete(
            record_cache::table.filter(
                record_cache::key
                    .eq(key)
                    .and(record_cache::written_at.eq(written_at)),
            ),
        )
        .execute(&mut conn)
        .await?;

        Ok(())
    }
}
