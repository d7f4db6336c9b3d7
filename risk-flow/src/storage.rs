use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{error::Result, session::ConsoleSession};

/// Trait for storing and retrieving console sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Arc<ConsoleSession>) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Arc<ConsoleSession>>>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// Remove sessions idle for longer than `max_idle` and hand them back.
    async fn evict_idle(&self, max_idle: Duration) -> Result<Vec<Arc<ConsoleSession>>>;
}

/// In-memory implementation of SessionStorage
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Arc<ConsoleSession>>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Arc<ConsoleSession>) -> Result<()> {
        self.sessions.insert(session.id().to_string(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Arc<ConsoleSession>>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<Vec<Arc<ConsoleSession>>> {
        let mut evicted = Vec::new();
        self.sessions.retain(|_, session| {
            if session.idle_for() > max_idle {
                evicted.push(session.clone());
                false
            } else {
                true
            }
        });
        Ok(evicted)
    }
}
