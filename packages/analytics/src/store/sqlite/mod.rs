//! SQLite knowledge store
//!
//! File-backed implementation of [`KnowledgeStore`] on a single connection
//! guarded by a mutex. Range invariants are enforced twice: by `CHECK`
//! constraints on write and by validation on read.

pub mod migrations;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use prep_algo::{validate_params, BktParams, Trend};
use rusqlite::{params, Connection, OptionalExtension};

use super::{KnowledgeStore, StoreError, StoreResult};
use crate::model::{
    AnalyticsSnapshot, KnowledgeState, QuizAttempt, QuizSession, SessionKind, TopicAnalytics,
};

pub struct SqliteStore {
    connection: Mutex<Connection>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) a database file and bring its schema up to date
    pub fn open<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Migration(format!("cannot create {}: {}", parent.display(), e)))?;
        }

        let connection = Connection::open(path)?;
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        Self::with_connection(connection, path.to_string_lossy().to_string())
    }

    /// In-memory database, for tests
    pub fn in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::with_connection(connection, ":memory:".to_string())
    }

    fn with_connection(connection: Connection, db_path: String) -> StoreResult<Self> {
        let version = migrations::run_migrations(&connection)?;
        tracing::debug!(path = %db_path, version, "knowledge store ready");

        Ok(Self {
            connection: Mutex::new(connection),
            db_path,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn get_connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// Run `f` inside a transaction on the shared connection
    pub fn transaction<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

fn upsert_knowledge(
    conn: &Connection,
    user_id: &str,
    state: &KnowledgeState,
    updated_at: &str,
) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO knowledge_state
            (user_id, topic, p_learn, p_slip, p_guess, p_known, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(user_id, topic) DO UPDATE SET
            p_learn = excluded.p_learn,
            p_slip = excluded.p_slip,
            p_guess = excluded.p_guess,
            p_known = excluded.p_known,
            updated_at = excluded.updated_at
        "#,
    )?;
    for (topic, p) in state {
        stmt.execute(params![
            user_id, topic, p.p_learn, p.p_slip, p.p_guess, p.p_known, updated_at
        ])?;
    }
    Ok(())
}

fn upsert_analytics(conn: &Connection, user_id: &str, analytics: &AnalyticsSnapshot) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO topic_analytics
            (user_id, topic, mastery_probability, forecasted_score, attempts_count,
             average_time, last_practiced, trend)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(user_id, topic) DO UPDATE SET
            mastery_probability = excluded.mastery_probability,
            forecasted_score = excluded.forecasted_score,
            attempts_count = excluded.attempts_count,
            average_time = excluded.average_time,
            last_practiced = excluded.last_practiced,
            trend = excluded.trend
        "#,
    )?;
    for (topic, a) in analytics {
        stmt.execute(params![
            user_id,
            topic,
            a.mastery_probability,
            a.forecasted_score,
            a.attempts_count,
            a.average_time,
            format_time(&a.last_practiced),
            a.trend.as_str(),
        ])?;
    }
    Ok(())
}

/// Session ids are unique per user
fn insert_session(conn: &Connection, session: &QuizSession) -> StoreResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM quiz_session WHERE user_id = ?1 AND id = ?2",
            params![session.user_id, session.id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        return Err(StoreError::DuplicateSession(session.id.clone()));
    }

    let attempts = serde_json::to_string(&session.attempts)?;
    conn.execute(
        r#"
        INSERT INTO quiz_session
            (id, user_id, completed_at, kind, subject, score, total_marks, attempts)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            session.id,
            session.user_id,
            format_time(&session.completed_at),
            session.kind.as_str(),
            session.subject,
            session.score,
            session.total_marks,
            attempts,
        ],
    )?;
    Ok(())
}

impl KnowledgeStore for SqliteStore {
    fn load_knowledge_state(&self, user_id: &str) -> StoreResult<KnowledgeState> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT topic, p_learn, p_slip, p_guess, p_known
             FROM knowledge_state WHERE user_id = ?1",
        )?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    BktParams {
                        p_learn: row.get(1)?,
                        p_slip: row.get(2)?,
                        p_guess: row.get(3)?,
                        p_known: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = KnowledgeState::new();
        for (topic, params) in rows {
            validate_params(&params)
                .map_err(|e| StoreError::Corrupt(format!("knowledge state {user_id}/{topic}: {e}")))?;
            state.insert(topic, params);
        }
        Ok(state)
    }

    fn save_knowledge_state(&self, user_id: &str, state: &KnowledgeState) -> StoreResult<()> {
        let now = format_time(&Utc::now());
        self.transaction(|conn| upsert_knowledge(conn, user_id, state, &now))
    }

    fn load_analytics(&self, user_id: &str) -> StoreResult<AnalyticsSnapshot> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT topic, mastery_probability, forecasted_score, attempts_count,
                    average_time, last_practiced, trend
             FROM topic_analytics WHERE user_id = ?1",
        )?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut snapshot = AnalyticsSnapshot::new();
        for (topic, mastery, forecast, count, avg_time, last, trend) in rows {
            let trend = trend
                .parse::<Trend>()
                .map_err(|_| StoreError::Corrupt(format!("unknown trend {trend:?} for {topic}")))?;
            let analytics = TopicAnalytics {
                topic: topic.clone(),
                mastery_probability: mastery,
                forecasted_score: forecast,
                attempts_count: count,
                average_time: avg_time,
                last_practiced: parse_time(&last)?,
                trend,
            };
            snapshot.insert(topic, analytics);
        }
        Ok(snapshot)
    }

    fn save_analytics(&self, user_id: &str, analytics: &AnalyticsSnapshot) -> StoreResult<()> {
        self.transaction(|conn| upsert_analytics(conn, user_id, analytics))
    }

    fn append_session(&self, session: &QuizSession) -> StoreResult<()> {
        self.transaction(|conn| insert_session(conn, session))
    }

    fn commit_session(
        &self,
        session: &QuizSession,
        state: &KnowledgeState,
        analytics: &AnalyticsSnapshot,
    ) -> StoreResult<()> {
        let now = format_time(&Utc::now());
        self.transaction(|conn| {
            insert_session(conn, session)?;
            upsert_knowledge(conn, &session.user_id, state, &now)?;
            upsert_analytics(conn, &session.user_id, analytics)
        })
    }

    fn load_sessions(&self, user_id: &str) -> StoreResult<Vec<QuizSession>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, completed_at, kind, subject, score, total_marks, attempts
             FROM quiz_session WHERE user_id = ?1
             ORDER BY completed_at DESC, rowid DESC",
        )?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, completed_at, kind, subject, score, total_marks, attempts)| {
                let kind = kind
                    .parse::<SessionKind>()
                    .map_err(|_| StoreError::Corrupt(format!("unknown session kind {kind:?}")))?;
                let attempts: Vec<QuizAttempt> = serde_json::from_str(&attempts)?;
                Ok(QuizSession {
                    id,
                    user_id: user_id.to_string(),
                    completed_at: parse_time(&completed_at)?,
                    kind,
                    subject,
                    score,
                    total_marks,
                    attempts,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, hour, 0, 0).unwrap()
    }

    fn sample_session(id: &str, hour: u32) -> QuizSession {
        QuizSession {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            completed_at: fixed_time(hour),
            kind: SessionKind::Mock,
            subject: Some("Operating Systems".to_string()),
            score: 32.0,
            total_marks: 50.0,
            attempts: vec![
                QuizAttempt::graded("Paging", true, 40.0),
                QuizAttempt::scored("Deadlocks", 8.5, 95.0),
            ],
        }
    }

    #[test]
    fn test_knowledge_state_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut state = KnowledgeState::new();
        state.insert("Paging".to_string(), BktParams::default());
        state.insert(
            "Deadlocks".to_string(),
            BktParams {
                p_known: 0.99,
                ..BktParams::default()
            },
        );

        store.save_knowledge_state("user-1", &state).unwrap();
        assert_eq!(store.load_knowledge_state("user-1").unwrap(), state);
        assert!(store.load_knowledge_state("user-2").unwrap().is_empty());
    }

    #[test]
    fn test_knowledge_state_upsert_never_deletes() {
        let store = SqliteStore::in_memory().unwrap();
        let mut first = KnowledgeState::new();
        first.insert("A".to_string(), BktParams::default());
        store.save_knowledge_state("user-1", &first).unwrap();

        let mut second = KnowledgeState::new();
        second.insert(
            "A".to_string(),
            BktParams {
                p_known: 0.5,
                ..BktParams::default()
            },
        );
        second.insert("B".to_string(), BktParams::default());
        store.save_knowledge_state("user-1", &second).unwrap();

        store.save_knowledge_state("user-1", &KnowledgeState::new()).unwrap();

        let loaded = store.load_knowledge_state("user-1").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["A"].p_known, 0.5);
    }

    #[test]
    fn test_invalid_params_are_rejected_on_write() {
        let store = SqliteStore::in_memory().unwrap();
        let mut state = KnowledgeState::new();
        state.insert(
            "A".to_string(),
            BktParams {
                p_known: 1.0,
                ..BktParams::default()
            },
        );
        let err = store.save_knowledge_state("user-1", &state).unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert!(store.load_knowledge_state("user-1").unwrap().is_empty());
    }

    #[test]
    fn test_analytics_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut snapshot = AnalyticsSnapshot::new();
        snapshot.insert(
            "Paging".to_string(),
            TopicAnalytics {
                topic: "Paging".to_string(),
                mastery_probability: 0.6927,
                forecasted_score: 69,
                attempts_count: 4,
                average_time: 37.5,
                last_practiced: fixed_time(9),
                trend: Trend::Up,
            },
        );

        store.save_analytics("user-1", &snapshot).unwrap();
        assert_eq!(store.load_analytics("user-1").unwrap(), snapshot);
    }

    #[test]
    fn test_sessions_round_trip_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        store.append_session(&sample_session("s1", 8)).unwrap();
        store.append_session(&sample_session("s2", 10)).unwrap();

        let sessions = store.load_sessions("user-1").unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0], sample_session("s2", 10));
        assert_eq!(sessions[1].id, "s1");

        let err = store.append_session(&sample_session("s1", 11)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSession(_)));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prep.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let mut state = KnowledgeState::new();
            state.insert("Trees".to_string(), BktParams::default());
            store.save_knowledge_state("user-1", &state).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load_knowledge_state("user-1").unwrap().len(), 1);
        assert!(reopened.db_path().ends_with("prep.db"));
    }

    #[test]
    fn test_session_ids_are_scoped_per_user() {
        let store = SqliteStore::in_memory().unwrap();
        store.append_session(&sample_session("s1", 8)).unwrap();

        let mut other = sample_session("s1", 9);
        other.user_id = "user-2".to_string();
        store.append_session(&other).unwrap();

        assert_eq!(store.load_sessions("user-1").unwrap().len(), 1);
        assert_eq!(store.load_sessions("user-2").unwrap()[0].user_id, "user-2");
    }

    #[test]
    fn test_commit_session_is_atomic() {
        let store = SqliteStore::in_memory().unwrap();
        let mut state = KnowledgeState::new();
        state.insert("Paging".to_string(), BktParams::default());
        store
            .commit_session(&sample_session("s1", 8), &state, &AnalyticsSnapshot::new())
            .unwrap();

        // duplicate id: nothing else is written
        let mut changed = KnowledgeState::new();
        changed.insert(
            "Paging".to_string(),
            BktParams {
                p_known: 0.9,
                ..BktParams::default()
            },
        );
        let err = store
            .commit_session(&sample_session("s1", 9), &changed, &AnalyticsSnapshot::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSession(_)));
        assert_eq!(store.load_knowledge_state("user-1").unwrap(), state);

        // a failing state write rolls the session insert back
        let mut invalid = KnowledgeState::new();
        invalid.insert(
            "Paging".to_string(),
            BktParams {
                p_known: 1.0,
                ..BktParams::default()
            },
        );
        let err = store
            .commit_session(&sample_session("s2", 10), &invalid, &AnalyticsSnapshot::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert_eq!(store.load_sessions("user-1").unwrap().len(), 1);
        assert_eq!(store.load_knowledge_state("user-1").unwrap(), state);
    }
}

