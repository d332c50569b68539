//! # prep-analytics
//!
//! Tracks per-topic mastery from graded quiz sessions.
//!
//! - [`aggregator`] - folds a session's attempts into BKT state and topic metrics
//! - [`store`] - the knowledge store contract with in-memory and SQLite backends
//! - [`pipeline`] - load, aggregate and save one session per user transaction
//! - [`insights`] - weakest/strongest topics, session summaries, profile totals

pub mod aggregator;
pub mod config;
pub mod error;
pub mod insights;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod store;

pub use aggregator::{AggregationOutput, TopicAggregator};
pub use config::{AggregatorConfig, AnalyticsConfig};
pub use error::{AnalyticsError, AnalyticsResult};
pub use model::{AnalyticsSnapshot, KnowledgeState, QuizAttempt, QuizSession, SessionKind, TopicAnalytics};
pub use pipeline::{SessionOutcome, SessionPipeline};
pub use store::{KnowledgeStore, MemoryStore, SqliteStore, StoreError};
