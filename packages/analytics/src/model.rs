use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use prep_algo::{BktParams, Trend};
use serde::{Deserialize, Serialize};

/// Per-topic BKT parameters of one user
pub type KnowledgeState = BTreeMap<String, BktParams>;

/// Latest analytics per topic of one user
pub type AnalyticsSnapshot = BTreeMap<String, TopicAnalytics>;

/// One graded answer from a finished quiz session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub topic: String,
    #[serde(default)]
    pub is_correct: Option<bool>,
    /// Subjective grade on a 0-10 scale
    #[serde(default)]
    pub score: Option<f64>,
    /// Seconds spent on the question
    pub time_taken: f64,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl QuizAttempt {
    pub fn graded(topic: impl Into<String>, is_correct: bool, time_taken: f64) -> Self {
        Self {
            topic: topic.into(),
            is_correct: Some(is_correct),
            score: None,
            time_taken,
            question_id: None,
            subject: None,
            difficulty: None,
        }
    }

    pub fn scored(topic: impl Into<String>, score: f64, time_taken: f64) -> Self {
        Self {
            topic: topic.into(),
            is_correct: None,
            score: Some(score),
            time_taken,
            question_id: None,
            subject: None,
            difficulty: None,
        }
    }

    /// Binary evidence for the tracing model: marked correct, or a
    /// subjective score above `threshold`.
    pub fn is_correct_evidence(&self, threshold: f64) -> bool {
        self.is_correct == Some(true) || self.score.map_or(false, |s| s > threshold)
    }
}

/// Derived analytics for one topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAnalytics {
    pub topic: String,
    pub mastery_probability: f64,
    pub forecasted_score: u32,
    /// Attempts seen in the aggregation call that produced this entry
    pub attempts_count: u32,
    pub average_time: f64,
    pub last_practiced: DateTime<Utc>,
    pub trend: Trend,
}

impl TopicAnalytics {
    /// Mastery as a 0-100 integer
    pub fn mastery_score(&self) -> u32 {
        (self.mastery_probability * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionKind {
    Practice,
    Mock,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Practice => "PRACTICE",
            SessionKind::Mock => "MOCK",
        }
    }
}

impl FromStr for SessionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRACTICE" => Ok(SessionKind::Practice),
            "MOCK" => Ok(SessionKind::Mock),
            _ => Err(()),
        }
    }
}

/// A finished quiz session as handed over by the quiz engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub id: String,
    pub user_id: String,
    pub completed_at: DateTime<Utc>,
    pub kind: SessionKind,
    #[serde(default)]
    pub subject: Option<String>,
    pub score: f64,
    pub total_marks: f64,
    pub attempts: Vec<QuizAttempt>,
}

impl QuizSession {
    /// Total score as a percentage of the available marks
    pub fn score_percent(&self) -> f64 {
        if self.total_marks > 0.0 {
            (self.score / self.total_marks * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Share of attempts counted as correct evidence
    pub fn accuracy(&self, threshold: f64) -> f64 {
        if self.attempts.is_empty() {
            return 0.0;
        }
        let correct = self
            .attempts
            .iter()
            .filter(|a| a.is_correct_evidence(threshold))
            .count();
        correct as f64 / self.attempts.len() as f64
    }
}
