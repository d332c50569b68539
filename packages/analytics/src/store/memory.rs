use std::collections::HashMap;

use parking_lot::RwLock;

use super::{KnowledgeStore, StoreError, StoreResult};
use crate::model::{AnalyticsSnapshot, KnowledgeState, QuizSession};

#[derive(Debug, Default, Clone)]
struct UserRecord {
    knowledge: KnowledgeState,
    analytics: AnalyticsSnapshot,
    sessions: Vec<QuizSession>,
}

impl UserRecord {
    fn merge_knowledge(&mut self, state: &KnowledgeState) {
        self.knowledge
            .extend(state.iter().map(|(k, v)| (k.clone(), *v)));
    }

    fn merge_analytics(&mut self, analytics: &AnalyticsSnapshot) {
        self.analytics
            .extend(analytics.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn push_session(&mut self, session: &QuizSession) -> StoreResult<()> {
        if self.sessions.iter().any(|s| s.id == session.id) {
            return Err(StoreError::DuplicateSession(session.id.clone()));
        }
        self.sessions.push(session.clone());
        self.sessions
            .sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(())
    }
}

/// Process-local store, used by tests and as a scratch backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }
}

impl KnowledgeStore for MemoryStore {
    fn load_knowledge_state(&self, user_id: &str) -> StoreResult<KnowledgeState> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .map(|u| u.knowledge.clone())
            .unwrap_or_default())
    }

    fn save_knowledge_state(&self, user_id: &str, state: &KnowledgeState) -> StoreResult<()> {
        let mut users = self.users.write();
        users.entry(user_id.to_string()).or_default().merge_knowledge(state);
        Ok(())
    }

    fn load_analytics(&self, user_id: &str) -> StoreResult<AnalyticsSnapshot> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .map(|u| u.analytics.clone())
            .unwrap_or_default())
    }

    fn save_analytics(&self, user_id: &str, analytics: &AnalyticsSnapshot) -> StoreResult<()> {
        let mut users = self.users.write();
        users.entry(user_id.to_string()).or_default().merge_analytics(analytics);
        Ok(())
    }

    fn append_session(&self, session: &QuizSession) -> StoreResult<()> {
        let mut users = self.users.write();
        users
            .entry(session.user_id.clone())
            .or_default()
            .push_session(session)
    }

    fn commit_session(
        &self,
        session: &QuizSession,
        state: &KnowledgeState,
        analytics: &AnalyticsSnapshot,
    ) -> StoreResult<()> {
        let mut users = self.users.write();
        let record = users.entry(session.user_id.clone()).or_default();
        record.push_session(session)?;
        record.merge_knowledge(state);
        record.merge_analytics(analytics);
        Ok(())
    }

    fn load_sessions(&self, user_id: &str) -> StoreResult<Vec<QuizSession>> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .map(|u| u.sessions.clone())
            .unwrap_or_default())
    }
}
