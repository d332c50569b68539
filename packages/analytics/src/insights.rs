//! Read-side queries over stored analytics and session history.

use prep_algo::{percentile::percentile, predict_next};
use serde::Serialize;

use crate::model::{AnalyticsSnapshot, QuizSession, TopicAnalytics};

/// Topics below this mastery are reported as weak in a session summary
pub const WEAK_MASTERY: f64 = 0.5;

/// Topics at or above this mastery are reported as strong
pub const STRONG_MASTERY: f64 = 0.8;

/// Parameters for summarizing a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryParams {
    pub correctness_threshold: f64,
    pub population_mean: f64,
    pub population_std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub score_percent: f64,
    pub accuracy: f64,
    pub percentile: u8,
    /// Linear extrapolation over the session score history, this session included
    pub projected_next_score: f64,
    pub weak_topics: Vec<String>,
    pub strong_topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub sessions_completed: usize,
    pub total_xp: f64,
    pub average_score_percent: f64,
}

fn sorted_by_mastery(snapshot: &AnalyticsSnapshot) -> Vec<&TopicAnalytics> {
    let mut topics: Vec<&TopicAnalytics> = snapshot.values().collect();
    topics.sort_by(|a, b| {
        a.mastery_probability
            .total_cmp(&b.mastery_probability)
            .then_with(|| a.topic.cmp(&b.topic))
    });
    topics
}

/// Lowest mastery first
pub fn weakest_topics(snapshot: &AnalyticsSnapshot, limit: usize) -> Vec<&TopicAnalytics> {
    let mut topics = sorted_by_mastery(snapshot);
    topics.truncate(limit);
    topics
}

/// Highest mastery first
pub fn strongest_topics(snapshot: &AnalyticsSnapshot, limit: usize) -> Vec<&TopicAnalytics> {
    let mut topics = sorted_by_mastery(snapshot);
    topics.reverse();
    topics.truncate(limit);
    topics
}

pub fn topic_stats<'a>(snapshot: &'a AnalyticsSnapshot, topic: &str) -> Option<&'a TopicAnalytics> {
    snapshot.get(topic)
}

/// Summarize one session.
///
/// `metrics` are the analytics produced for this session; `prior_percents`
/// are earlier session scores in chronological order, oldest first.
pub fn summarize_session(
    session: &QuizSession,
    metrics: &AnalyticsSnapshot,
    prior_percents: &[f64],
    params: &SummaryParams,
) -> SessionSummary {
    let score_percent = session.score_percent();

    let mut history = prior_percents.to_vec();
    history.push(score_percent);

    let weak_topics = sorted_by_mastery(metrics)
        .into_iter()
        .filter(|a| a.mastery_probability < WEAK_MASTERY)
        .map(|a| a.topic.clone())
        .collect();
    let strong_topics = sorted_by_mastery(metrics)
        .into_iter()
        .rev()
        .filter(|a| a.mastery_probability >= STRONG_MASTERY)
        .map(|a| a.topic.clone())
        .collect();

    SessionSummary {
        session_id: session.id.clone(),
        score_percent,
        accuracy: session.accuracy(params.correctness_threshold),
        percentile: percentile(score_percent, params.population_mean, params.population_std_dev),
        projected_next_score: predict_next(&history),
        weak_topics,
        strong_topics,
    }
}

/// Totals over a user's sessions; XP is the sum of raw session scores
pub fn profile_stats(sessions: &[QuizSession]) -> ProfileStats {
    if sessions.is_empty() {
        return ProfileStats::default();
    }

    let total_xp = sessions.iter().map(|s| s.score).sum();
    let percent_sum: f64 = sessions.iter().map(|s| s.score_percent()).sum();

    ProfileStats {
        sessions_completed: sessions.len(),
        total_xp,
        average_score_percent: percent_sum / sessions.len() as f64,
    }
}
