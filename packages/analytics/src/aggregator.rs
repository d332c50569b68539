//! Topic Aggregation
//!
//! Folds one session's attempts into per-topic knowledge state:
//! - attempts are partitioned by topic, keeping session order inside a topic
//! - each topic starts from its stored parameters, or the prior when unseen
//! - BKT steps are applied in order (updates do not commute)
//! - metrics are derived from the resulting mastery
//!
//! The aggregator is a pure function of its inputs; persistence happens in
//! [`crate::pipeline`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use prep_algo::{bkt, validate_params, Trend};

use crate::config::{AggregatorConfig, MAX_ATTEMPT_SCORE};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::model::{AnalyticsSnapshot, KnowledgeState, QuizAttempt, TopicAnalytics};

/// Result of one aggregation call
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutput {
    /// Analytics for the topics present in the attempt list
    pub metrics: AnalyticsSnapshot,
    /// Previous state with every touched topic replaced
    pub new_state: KnowledgeState,
}

#[derive(Debug, Clone, Default)]
pub struct TopicAggregator {
    config: AggregatorConfig,
}

impl TopicAggregator {
    pub fn new(config: AggregatorConfig) -> AnalyticsResult<Self> {
        validate_params(&config.prior).map_err(|source| AnalyticsError::InvalidParams {
            topic: "(prior)".to_string(),
            source,
        })?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn aggregate(
        &self,
        attempts: &[QuizAttempt],
        previous: &KnowledgeState,
    ) -> AnalyticsResult<AggregationOutput> {
        self.aggregate_at(attempts, previous, Utc::now())
    }

    /// Same as [`aggregate`](Self::aggregate) with an explicit `lastPracticed` time
    pub fn aggregate_at(
        &self,
        attempts: &[QuizAttempt],
        previous: &KnowledgeState,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<AggregationOutput> {
        validate_state(previous)?;
        for (index, attempt) in attempts.iter().enumerate() {
            validate_attempt(index, attempt)?;
        }

        let mut new_state = previous.clone();
        let mut metrics = AnalyticsSnapshot::new();
        let prior_score = self.config.prior.mastery_score();

        for (topic, group) in group_by_topic(attempts) {
            let start = previous.get(topic).copied().unwrap_or(self.config.prior);
            let threshold = self.config.correctness_threshold;
            let params = bkt::update_sequence(
                start,
                group.iter().map(|a| a.is_correct_evidence(threshold)),
            );
            new_state.insert(topic.to_string(), params);

            let forecasted_score = params.mastery_score();
            let prev_score = previous
                .get(topic)
                .map(|p| p.mastery_score())
                .unwrap_or(prior_score);
            let trend = Trend::between(prev_score, forecasted_score);

            let total_time: f64 = group.iter().map(|a| a.time_taken).sum();
            let average_time = total_time / group.len() as f64;

            tracing::debug!(
                topic,
                attempts = group.len(),
                p_known = params.p_known,
                trend = trend.as_str(),
                "topic aggregated"
            );

            metrics.insert(
                topic.to_string(),
                TopicAnalytics {
                    topic: topic.to_string(),
                    mastery_probability: params.p_known,
                    forecasted_score,
                    attempts_count: u32::try_from(group.len()).unwrap_or(u32::MAX),
                    average_time,
                    last_practiced: now,
                    trend,
                },
            );
        }

        Ok(AggregationOutput { metrics, new_state })
    }
}

/// Partition attempts by topic; order inside each group follows the input
pub fn group_by_topic(attempts: &[QuizAttempt]) -> BTreeMap<&str, Vec<&QuizAttempt>> {
    let mut groups: BTreeMap<&str, Vec<&QuizAttempt>> = BTreeMap::new();
    for attempt in attempts {
        groups.entry(attempt.topic.as_str()).or_default().push(attempt);
    }
    groups
}

pub fn validate_state(state: &KnowledgeState) -> AnalyticsResult<()> {
    for (topic, params) in state {
        validate_params(params).map_err(|source| AnalyticsError::InvalidParams {
            topic: topic.clone(),
            source,
        })?;
    }
    Ok(())
}

pub fn validate_attempt(index: usize, attempt: &QuizAttempt) -> AnalyticsResult<()> {
    let invalid = |reason: String| AnalyticsError::InvalidAttempt { index, reason };

    if attempt.topic.trim().is_empty() {
        return Err(invalid("topic is empty".to_string()));
    }
    if attempt.is_correct.is_none() && attempt.score.is_none() {
        return Err(invalid("neither isCorrect nor score is set".to_string()));
    }
    if let Some(score) = attempt.score {
        if !score.is_finite() || !(0.0..=MAX_ATTEMPT_SCORE).contains(&score) {
            return Err(invalid(format!(
                "score {score} is outside [0, {MAX_ATTEMPT_SCORE}]"
            )));
        }
    }
    if !attempt.time_taken.is_finite() || attempt.time_taken < 0.0 {
        return Err(invalid(format!(
            "timeTaken {} must be a non-negative number",
            attempt.time_taken
        )));
    }
    Ok(())
}
