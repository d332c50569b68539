//! Knowledge persistence
//!
//! One repository abstraction for everything the pipeline reads and writes:
//! - per-topic BKT parameters of a user
//! - the latest per-topic analytics snapshot of a user
//! - finished quiz sessions, used for score history
//!
//! Saves are upserts: a topic is overwritten in place and never deleted.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

use crate::model::{AnalyticsSnapshot, KnowledgeState, QuizSession};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("session {0} already exists")]
    DuplicateSession(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait KnowledgeStore: Send + Sync {
    /// Knowledge state of a user; empty when the user is unknown
    fn load_knowledge_state(&self, user_id: &str) -> StoreResult<KnowledgeState>;

    fn save_knowledge_state(&self, user_id: &str, state: &KnowledgeState) -> StoreResult<()>;

    /// Latest analytics snapshot of a user; empty when the user is unknown
    fn load_analytics(&self, user_id: &str) -> StoreResult<AnalyticsSnapshot>;

    fn save_analytics(&self, user_id: &str, analytics: &AnalyticsSnapshot) -> StoreResult<()>;

    /// Record a finished session; ids are unique per user
    fn append_session(&self, session: &QuizSession) -> StoreResult<()>;

    /// Record `session` and upsert the user's state and analytics as one
    /// atomic write. A duplicate session id fails with
    /// [`StoreError::DuplicateSession`] and leaves the store unchanged.
    fn commit_session(
        &self,
        session: &QuizSession,
        state: &KnowledgeState,
        analytics: &AnalyticsSnapshot,
    ) -> StoreResult<()>;

    /// Sessions of a user, newest first
    fn load_sessions(&self, user_id: &str) -> StoreResult<Vec<QuizSession>>;
}
