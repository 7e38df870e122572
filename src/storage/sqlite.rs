use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{AnalysisRecord, ReviewLogEntry, Storage};
use crate::analysis::{AnalysisPhase, PhraseHash};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::review::ReviewScore;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) the database file and run migrations
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// In-memory database for tests.
    ///
    /// Each SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        debug!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save_analysis(&self, record: &AnalysisRecord) -> StorageResult<()> {
        let tokens = serde_json::to_string(&record.tokens).map_err(|e| StorageError::Query {
            message: format!("Failed to serialize tokens: {}", e),
        })?;

        sqlx::query(
            r#"
            INSERT INTO analyses (id, phrase, phrase_hash, document_id, phase, tokens, error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.phrase)
        .bind(record.phrase_hash.to_string())
        .bind(record.document_id)
        .bind(record.phase.as_str())
        .bind(&tokens)
        .bind(&record.error)
        .bind(timestamp(&record.created_at))
        .execute(&self.pool)
        .await?;

        debug!(id = %record.id, phase = %record.phase, "Analysis saved");
        Ok(())
    }

    async fn get_latest_analysis(
        &self,
        phrase_hash: PhraseHash,
    ) -> StorageResult<Option<AnalysisRecord>> {
        let row: Option<AnalysisRow> = sqlx::query_as(
            r#"
            SELECT id, phrase, phrase_hash, document_id, phase, tokens, error, created_at
            FROM analyses
            WHERE phrase_hash = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(phrase_hash.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_analyses(&self, limit: u32) -> StorageResult<Vec<AnalysisRecord>> {
        let rows: Vec<AnalysisRow> = sqlx::query_as(
            r#"
            SELECT id, phrase, phrase_hash, document_id, phase, tokens, error, created_at
            FROM analyses
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn log_review(&self, entry: &ReviewLogEntry) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO review_log (id, card_id, word, score, retention_level, next_review_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.card_id)
        .bind(&entry.word)
        .bind(i64::from(entry.score.value()))
        .bind(i64::from(entry.retention_level))
        .bind(timestamp(&entry.next_review_at))
        .bind(timestamp(&entry.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_reviews(&self, limit: u32) -> StorageResult<Vec<ReviewLogEntry>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, card_id, word, score, retention_level, next_review_at, created_at
            FROM review_log
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReviewLogEntry::try_from).collect()
    }
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct AnalysisRow {
    id: String,
    phrase: String,
    phrase_hash: String,
    document_id: Option<i64>,
    phase: String,
    tokens: String,
    error: Option<String>,
    created_at: String,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        let tokens = serde_json::from_str(&row.tokens).unwrap_or_else(|e| {
            warn!(id = %row.id, error = %e, "Stored tokens unreadable");
            Vec::new()
        });

        Self {
            phrase_hash: row
                .phrase_hash
                .parse()
                .unwrap_or_else(|_| PhraseHash::of(&row.phrase)),
            id: row.id,
            phrase: row.phrase,
            document_id: row.document_id,
            phase: row.phase.parse().unwrap_or(AnalysisPhase::Error),
            tokens,
            error: row.error,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    card_id: i64,
    word: String,
    score: i64,
    retention_level: i64,
    next_review_at: String,
    created_at: String,
}

impl TryFrom<ReviewRow> for ReviewLogEntry {
    type Error = StorageError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let score = u8::try_from(row.score)
            .ok()
            .and_then(|s| ReviewScore::new(s).ok())
            .ok_or_else(|| StorageError::Query {
                message: format!("Invalid score {} in review {}", row.score, row.id),
            })?;

        Ok(Self {
            id: row.id,
            card_id: row.card_id,
            word: row.word,
            score,
            retention_level: i32::try_from(row.retention_level).unwrap_or(i32::MAX),
            next_review_at: parse_timestamp(&row.next_review_at),
            created_at: parse_timestamp(&row.created_at),
        })
    }
}
