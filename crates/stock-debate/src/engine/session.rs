//! Disposable per-run mirror of the transcript
//!
//! Stands in for a hosted conversation thread. The orchestrator's transcript
//! stays authoritative; the store only ever receives copies.

use super::result::Turn;
use crate::error::{DebateError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identifier of one mirrored debate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External store holding a copy of each run's turns
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open a session for a new run
    async fn create(&self, ticker: &str) -> Result<SessionId>;

    /// Mirror a recorded turn
    async fn append(&self, session: &SessionId, turn: &Turn) -> Result<()>;

    /// Dispose of the session
    async fn delete(&self, session: &SessionId) -> Result<()>;
}

#[derive(Debug, Clone)]
struct SessionRecord {
    ticker: String,
    turns: Vec<Turn>,
}

/// Session store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of the turns mirrored into a session
    pub async fn turns(&self, session: &SessionId) -> Option<Vec<Turn>> {
        self.sessions
            .read()
            .await
            .get(session)
            .map(|record| record.turns.clone())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, ticker: &str) -> Result<SessionId> {
        let id = SessionId::new();
        self.sessions.write().await.insert(
            id.clone(),
            SessionRecord {
                ticker: ticker.to_string(),
                turns: Vec::new(),
            },
        );
        tracing::debug!(session = %id, ticker, "Session created");
        Ok(id)
    }

    async fn append(&self, session: &SessionId, turn: &Turn) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get_mut(session)
            .ok_or_else(|| DebateError::Other(format!("Unknown session {session}")))?;
        record.turns.push(turn.clone());
        Ok(())
    }

    async fn delete(&self, session: &SessionId) -> Result<()> {
        if let Some(record) = self.sessions.write().await.remove(session) {
            tracing::debug!(
                session = %session,
                ticker = %record.ticker,
                turns = record.turns.len(),
                "Session deleted"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::PersonaId;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = InMemorySessionStore::new();
        let id = store.create("AAPL").await.unwrap();
        assert_eq!(store.len().await, 1);

        let turn = Turn::success(PersonaId::Bull, 0, "Opening".to_string());
        tokio_test::assert_ok!(store.append(&id, &turn).await);
        assert_eq!(store.turns(&id).await, Some(vec![turn]));

        tokio_test::assert_ok!(store.delete(&id).await);
        assert!(store.is_empty().await);
        assert!(store.turns(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_append_unknown_session() {
        let store = InMemorySessionStore::new();
        let turn = Turn::success(PersonaId::Bear, 0, "Risk".to_string());
        tokio_test::assert_err!(store.append(&SessionId::new(), &turn).await);
    }

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
