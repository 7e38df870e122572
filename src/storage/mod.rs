//! Local history store.
//!
//! This module provides SQLite-based storage for finished analysis sessions
//! and accepted review ratings. The backend remains the source of truth; the
//! local store only answers "what did I look at / rate recently".

mod sqlite;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{AnalysisPhase, AnalysisSession, PhraseHash, Token};
use crate::api::{DueCard, ReviewAck};
use crate::error::StorageResult;
use crate::review::ReviewScore;

/// A finished analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique record identifier.
    pub id: String,
    /// Input text as typed.
    pub phrase: String,
    /// Hash of the trimmed phrase.
    pub phrase_hash: PhraseHash,
    /// Backend document, when one was created.
    pub document_id: Option<i64>,
    /// Phase the session ended in.
    pub phase: AnalysisPhase,
    /// Merged token table.
    pub tokens: Vec<Token>,
    /// User-facing error message, if the session failed.
    pub error: Option<String>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Snapshot a session for storage.
    pub fn from_session(session: &AnalysisSession) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phrase: session.phrase().to_string(),
            phrase_hash: session
                .phrase_hash()
                .unwrap_or_else(|| PhraseHash::of(session.phrase())),
            document_id: session.document_id(),
            phase: session.phase(),
            tokens: session.tokens().rows().to_vec(),
            error: session.error().map(|e| e.message.clone()),
            created_at: Utc::now(),
        }
    }

    /// Whether the deep phase completed.
    pub fn is_complete(&self) -> bool {
        self.phase == AnalysisPhase::DeepReady
    }
}

/// One accepted review rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    /// Unique entry identifier.
    pub id: String,
    /// Server card id.
    pub card_id: i64,
    /// Word on the card.
    pub word: String,
    /// Score submitted.
    pub score: ReviewScore,
    /// Retention level the server assigned.
    pub retention_level: i32,
    /// Next review time the server scheduled.
    pub next_review_at: DateTime<Utc>,
    /// When the rating was accepted.
    pub created_at: DateTime<Utc>,
}

impl ReviewLogEntry {
    /// Build an entry from the server acknowledgement.
    pub fn from_ack(card: &DueCard, score: ReviewScore, ack: &ReviewAck) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            card_id: ack.id,
            word: card.word.clone(),
            score,
            retention_level: ack.retention_level,
            next_review_at: ack.next_review_at,
            created_at: Utc::now(),
        }
    }
}

/// Storage trait for local history.
#[async_trait]
pub trait Storage: Send + Sync {
    // Analysis history

    /// Record a finished analysis.
    async fn save_analysis(&self, record: &AnalysisRecord) -> StorageResult<()>;
    /// Most recent analysis of a phrase.
    async fn get_latest_analysis(
        &self,
        phrase_hash: PhraseHash,
    ) -> StorageResult<Option<AnalysisRecord>>;
    /// Recent analyses, newest first.
    async fn list_analyses(&self, limit: u32) -> StorageResult<Vec<AnalysisRecord>>;

    // Review log

    /// Record an accepted rating.
    async fn log_review(&self, entry: &ReviewLogEntry) -> StorageResult<()>;
    /// Recent ratings, newest first.
    async fn list_reviews(&self, limit: u32) -> StorageResult<Vec<ReviewLogEntry>>;
}
