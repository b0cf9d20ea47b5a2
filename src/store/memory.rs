//! In-process session store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::SessionStore;
use crate::error::Result;
use crate::runtime::Session;

/// Sessions held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    async fn create(&self, session_id: &str) -> Result<Session> {
        let session = Session::new(session_id);
        self.sessions
            .write()
            .insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    async fn save(&self, session: &mut Session) -> Result<()> {
        session.revision += 1;
        session.touch();
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }
}
