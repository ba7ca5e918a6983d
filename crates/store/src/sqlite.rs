//! SQLite store.
//!
//! Two tables:
//! - `hcps`: healthcare professionals
//! - `interactions`: contact events, `hcp_id` a foreign key into `hcps`
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text so that text
//! ordering matches chronological ordering. Every write is one statement.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use fieldrep_core::error::StoreError;
use fieldrep_core::record::{
    DATE_FORMAT, Hcp, Interaction, InteractionKind, InteractionPatch, NewHcp, NewInteraction,
    Sentiment, strip_honorific,
};
use fieldrep_core::store::RecordStore;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// A SQLite-backed record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    ///
    /// `sqlite::memory:` gives an ephemeral database. It is pinned to a
    /// single never-recycled connection, since every new connection to
    /// `:memory:` would see its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(url, "SQLite record store initialized");
        Ok(store)
    }

    /// An ephemeral store, for tests and demos.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hcps (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                specialty   TEXT NOT NULL DEFAULT '',
                hospital    TEXT NOT NULL DEFAULT '',
                email       TEXT NOT NULL DEFAULT '',
                phone       TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("hcps table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                hcp_id              INTEGER NOT NULL REFERENCES hcps(id),
                interaction_type    TEXT NOT NULL,
                notes               TEXT NOT NULL,
                products_discussed  TEXT,
                materials_shared    TEXT,
                sentiment           TEXT,
                follow_up_required  INTEGER NOT NULL DEFAULT 0,
                followup_date       TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("interactions table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_interactions_hcp_created \
             ON interactions(hcp_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("hcp/created_at index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_hcp(row: &SqliteRow) -> Result<Hcp, StoreError> {
        let created_at: String = column(row, "created_at")?;
        Ok(Hcp {
            id: column(row, "id")?,
            name: column(row, "name")?,
            specialty: column(row, "specialty")?,
            hospital: column(row, "hospital")?,
            email: column(row, "email")?,
            phone: column(row, "phone")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_interaction(row: &SqliteRow) -> Result<Interaction, StoreError> {
        let kind: String = column(row, "interaction_type")?;
        let sentiment: Option<String> = column(row, "sentiment")?;
        let followup_date: Option<String> = column(row, "followup_date")?;
        let created_at: String = column(row, "created_at")?;
        let updated_at: String = column(row, "updated_at")?;

        Ok(Interaction {
            id: column(row, "id")?,
            hcp_id: column(row, "hcp_id")?,
            kind: InteractionKind::from_str(&kind).map_err(StoreError::QueryFailed)?,
            notes: column(row, "notes")?,
            products_discussed: column(row, "products_discussed")?,
            materials_shared: column(row, "materials_shared")?,
            sentiment: sentiment
                .map(|s| Sentiment::from_str(&s))
                .transpose()
                .map_err(StoreError::QueryFailed)?,
            follow_up_required: column(row, "follow_up_required")?,
            followup_date: followup_date
                .map(|d| {
                    NaiveDate::parse_from_str(&d, DATE_FORMAT)
                        .map_err(|e| StoreError::QueryFailed(format!("followup_date '{d}': {e}")))
                })
                .transpose()?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("timestamp '{s}': {e}")))
}

fn write_error(context: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() || db.is_check_violation() || db.is_unique_violation() {
            return StoreError::Constraint(format!("{context}: {db}"));
        }
    }
    StoreError::Storage(format!("{context}: {e}"))
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_hcp(&self, hcp: NewHcp) -> Result<Hcp, StoreError> {
        hcp.validate().map_err(StoreError::Constraint)?;
        let result = sqlx::query(
            r#"
            INSERT INTO hcps (name, specialty, hospital, email, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&hcp.name)
        .bind(&hcp.specialty)
        .bind(&hcp.hospital)
        .bind(&hcp.email)
        .bind(&hcp.phone)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("INSERT hcp", e))?;

        let id = result.last_insert_rowid();
        debug!(hcp_id = id, "Created HCP");
        self.get_hcp(id)
            .await?
            .ok_or_else(|| StoreError::QueryFailed(format!("HCP {id} vanished after insert")))
    }

    async fn list_hcps(&self) -> Result<Vec<Hcp>, StoreError> {
        let rows = sqlx::query("SELECT * FROM hcps ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list hcps: {e}")))?;
        rows.iter().map(Self::row_to_hcp).collect()
    }

    async fn get_hcp(&self, id: i64) -> Result<Option<Hcp>, StoreError> {
        let row = sqlx::query("SELECT * FROM hcps WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("get hcp: {e}")))?;
        row.as_ref().map(Self::row_to_hcp).transpose()
    }

    // SQLite's lower() and LIKE fold ASCII only, so name matching happens
    // here with the same Unicode-aware predicate the in-memory store uses.
    async fn find_hcp_by_name(&self, name: &str) -> Result<Option<Hcp>, StoreError> {
        let needle = strip_honorific(name).to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        let hcps = self.list_hcps().await?;
        Ok(hcps.into_iter().find(|h| h.name_contains(&needle)))
    }

    async fn search_hcps(&self, query: &str, limit: usize) -> Result<Vec<Hcp>, StoreError> {
        let needle = query.trim().to_lowercase();
        let hcps = self.list_hcps().await?;
        Ok(hcps
            .into_iter()
            .filter(|h| h.matches_query(&needle))
            .take(limit)
            .collect())
    }

    async fn create_interaction(&self, new: NewInteraction) -> Result<Interaction, StoreError> {
        let created_at = timestamp(new.created_at.unwrap_or_else(Utc::now));
        let result = sqlx::query(
            r#"
            INSERT INTO interactions (
                hcp_id, interaction_type, notes, products_discussed, materials_shared,
                sentiment, follow_up_required, followup_date, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?8)
            "#,
        )
        .bind(new.hcp_id)
        .bind(new.kind.as_str())
        .bind(&new.notes)
        .bind(&new.products_discussed)
        .bind(&new.materials_shared)
        .bind(new.sentiment.map(|s| s.as_str()))
        .bind(new.follow_up_required)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("INSERT interaction", e))?;

        let id = result.last_insert_rowid();
        debug!(interaction_id = id, hcp_id = new.hcp_id, "Created interaction");
        self.get_interaction(id).await?.ok_or_else(|| {
            StoreError::QueryFailed(format!("interaction {id} vanished after insert"))
        })
    }

    async fn get_interaction(&self, id: i64) -> Result<Option<Interaction>, StoreError> {
        let row = sqlx::query("SELECT * FROM interactions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("get interaction: {e}")))?;
        row.as_ref().map(Self::row_to_interaction).transpose()
    }

    async fn list_interactions(&self) -> Result<Vec<Interaction>, StoreError> {
        let rows = sqlx::query("SELECT * FROM interactions ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list interactions: {e}")))?;
        rows.iter().map(Self::row_to_interaction).collect()
    }

    async fn recent_interactions(
        &self,
        hcp_id: i64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Interaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM interactions
            WHERE hcp_id = ?1 AND created_at >= ?2
            ORDER BY created_at DESC, id DESC
            LIMIT ?3
            "#,
        )
        .bind(hcp_id)
        .bind(timestamp(since))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("recent interactions: {e}")))?;
        rows.iter().map(Self::row_to_interaction).collect()
    }

    async fn update_interaction(
        &self,
        id: i64,
        patch: InteractionPatch,
    ) -> Result<Option<Interaction>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE interactions SET
                interaction_type   = COALESCE(?1, interaction_type),
                notes              = COALESCE(?2, notes),
                products_discussed = COALESCE(?3, products_discussed),
                materials_shared   = COALESCE(?4, materials_shared),
                sentiment          = COALESCE(?5, sentiment),
                follow_up_required = COALESCE(?6, follow_up_required),
                updated_at         = ?7
            WHERE id = ?8
            "#,
        )
        .bind(patch.kind.map(|k| k.as_str()))
        .bind(&patch.notes)
        .bind(&patch.products_discussed)
        .bind(&patch.materials_shared)
        .bind(patch.sentiment.map(|s| s.as_str()))
        .bind(patch.follow_up_required)
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("UPDATE interaction", e))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_interaction(id).await
    }

    async fn schedule_follow_up(
        &self,
        id: i64,
        date: NaiveDate,
    ) -> Result<Option<Interaction>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE interactions
            SET follow_up_required = 1, followup_date = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("schedule follow-up", e))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_interaction(id).await
    }

    async fn delete_interaction(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM interactions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("DELETE interaction", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_hcps(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hcps")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("count hcps: {e}")))?;
        Ok(count as usize)
    }

    async fn count_interactions(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interactions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("count interactions: {e}")))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let a = timestamp(DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z").unwrap().into());
        assert_eq!(a, "2025-01-02T03:04:05.000000Z");
        assert_eq!(parse_timestamp(&a).unwrap().timestamp(), 1735787045);
    }

    #[tokio::test]
    async fn in_memory_database_survives_across_queries() {
        let store = test_store().await;
        store
            .create_hcp(NewHcp::new("Michael Chen", "Oncology", "Regional Cancer Institute"))
            .await
            .unwrap();
        // A second pooled connection would see an empty database.
        assert_eq!(store.count_hcps().await.unwrap(), 1);
        assert_eq!(store.list_hcps().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn foreign_key_violation_is_constraint_error() {
        let store = test_store().await;
        let err = store
            .create_interaction(NewInteraction::new(99, InteractionKind::Visit, "ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.count_interactions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn wildcard_query_is_literal() {
        let store = test_store().await;
        store.create_hcp(NewHcp::new("John Smith", "Cardiology", "")).await.unwrap();
        assert!(store.search_hcps("%", 10).await.unwrap().is_empty());
        assert!(store.search_hcps("_", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("crm.db").display());

        {
            let store = SqliteStore::connect(&url, 4).await.unwrap();
            let hcp = store
                .create_hcp(NewHcp::new("Sarah Johnson", "Endocrinology", "Metro Medical Center"))
                .await
                .unwrap();
            store
                .create_interaction(
                    NewInteraction::new(hcp.id, InteractionKind::Call, "glucose monitoring")
                        .with_products("GlucoControl"),
                )
                .await
                .unwrap();
        }

        let reopened = SqliteStore::connect(&url, 4).await.unwrap();
        assert_eq!(reopened.count_hcps().await.unwrap(), 1);
        let all = reopened.list_interactions().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].products_discussed.as_deref(), Some("GlucoControl"));
    }
}
