//! Session Pipeline
//!
//! Load -> aggregate -> save for one finished session, run as one logical
//! transaction per user. Sessions of the same user are serialized through a
//! per-user mutex; different users proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::aggregator::TopicAggregator;
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::insights::{summarize_session, SessionSummary, SummaryParams};
use crate::model::{AnalyticsSnapshot, QuizSession};
use crate::store::{KnowledgeStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    /// Analytics for the topics practiced in this session
    pub metrics: AnalyticsSnapshot,
    pub summary: SessionSummary,
}

pub struct SessionPipeline<S: KnowledgeStore> {
    store: S,
    aggregator: TopicAggregator,
    summary_params: SummaryParams,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: KnowledgeStore> SessionPipeline<S> {
    pub fn new(store: S, config: &AnalyticsConfig) -> AnalyticsResult<Self> {
        let aggregator = TopicAggregator::new(config.aggregator.clone())?;
        Ok(Self {
            store,
            aggregator,
            summary_params: SummaryParams {
                correctness_threshold: config.aggregator.correctness_threshold,
                population_mean: config.percentile_mean,
                population_std_dev: config.percentile_std_dev,
            },
            user_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock();
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    /// Drop the user's lock entry once no other caller holds it
    fn release_user_lock(&self, user_id: &str) {
        let mut locks = self.user_locks.lock();
        if locks.get(user_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(user_id);
        }
    }

    /// Users with a session currently in flight
    pub fn active_users(&self) -> usize {
        self.user_locks.lock().len()
    }

    /// Fold a finished session into the user's stored knowledge and analytics.
    ///
    /// The session record, knowledge state and analytics are written in one
    /// atomic store call. Nothing is written when validation fails or the
    /// session was already processed. Store errors propagate unchanged.
    pub fn process_session(&self, session: &QuizSession) -> AnalyticsResult<SessionOutcome> {
        validate_session(session)?;

        let lock = self.user_lock(&session.user_id);
        let result = {
            let _guard = lock.lock();
            self.process_locked(session)
        };
        drop(lock);
        self.release_user_lock(&session.user_id);

        result
    }

    fn process_locked(&self, session: &QuizSession) -> AnalyticsResult<SessionOutcome> {
        let user_id = session.user_id.as_str();

        let history = self.store.load_sessions(user_id)?;
        if history.iter().any(|s| s.id == session.id) {
            return Err(StoreError::DuplicateSession(session.id.clone()).into());
        }

        let previous = self.store.load_knowledge_state(user_id)?;
        let output = self.aggregator.aggregate(&session.attempts, &previous)?;

        let mut analytics = self.store.load_analytics(user_id)?;
        analytics.extend(
            output
                .metrics
                .iter()
                .map(|(topic, a)| (topic.clone(), a.clone())),
        );

        self.store
            .commit_session(session, &output.new_state, &analytics)?;

        let prior_percents: Vec<f64> = history.iter().rev().map(|s| s.score_percent()).collect();
        let summary = summarize_session(session, &output.metrics, &prior_percents, &self.summary_params);

        tracing::info!(
            user_id,
            session_id = %session.id,
            attempts = session.attempts.len(),
            topics = output.metrics.len(),
            percentile = summary.percentile,
            "session processed"
        );

        Ok(SessionOutcome {
            metrics: output.metrics,
            summary,
        })
    }
}

pub fn validate_session(session: &QuizSession) -> AnalyticsResult<()> {
    if session.id.trim().is_empty() {
        return Err(AnalyticsError::InvalidSession("id is empty".to_string()));
    }
    if session.user_id.trim().is_empty() {
        return Err(AnalyticsError::InvalidSession("userId is empty".to_string()));
    }
    if !(session.total_marks.is_finite() && session.total_marks > 0.0) {
        return Err(AnalyticsError::InvalidSession(format!(
            "totalMarks {} must be positive",
            session.total_marks
        )));
    }
    if !session.score.is_finite() || session.score < 0.0 || session.score > session.total_marks {
        return Err(AnalyticsError::InvalidSession(format!(
            "score {} is outside [0, {}]",
            session.score, session.total_marks
        )));
    }
    Ok(())
}
