#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use prep_analytics::model::{QuizAttempt, QuizSession, SessionKind};

pub const USER: &str = "user-1";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

pub fn session(id: &str, day: i64, score: f64, attempts: Vec<QuizAttempt>) -> QuizSession {
    QuizSession {
        id: id.to_string(),
        user_id: USER.to_string(),
        completed_at: base_time() + Duration::days(day),
        kind: SessionKind::Practice,
        subject: Some("Operating Systems".to_string()),
        score,
        total_marks: 50.0,
        attempts,
    }
}

pub fn correct(topic: &str) -> QuizAttempt {
    QuizAttempt::graded(topic, true, 30.0)
}

pub fn wrong(topic: &str) -> QuizAttempt {
    QuizAttempt::graded(topic, false, 60.0)
}
