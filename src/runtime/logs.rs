//! Per-session operational log, mirrored into `tracing`.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::SessionId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Utc>,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Turn correlation for a log entry.
#[derive(Debug, Clone, Default)]
pub struct LogScope {
    pub turn_id: Option<String>,
    pub request_id: Option<String>,
}

impl LogScope {
    pub fn turn(turn_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            turn_id: Some(turn_id.into()),
            request_id: Some(request_id.into()),
        }
    }
}

/// Ring buffer of the most recent entries for one session.
#[derive(Debug)]
pub struct LogBuffer {
    session_id: SessionId,
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
    pub fn new(session_id: impl Into<SessionId>, capacity: usize) -> Self {
        Self {
            session_id: session_id.into(),
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn info(&self, message: &str, scope: &LogScope, metadata: serde_json::Value) -> LogEntry {
        self.write(LogLevel::Info, message, scope, metadata)
    }

    pub fn error(&self, message: &str, scope: &LogScope, metadata: serde_json::Value) -> LogEntry {
        self.write(LogLevel::Error, message, scope, metadata)
    }

    pub fn write(
        &self,
        level: LogLevel,
        message: &str,
        scope: &LogScope,
        metadata: serde_json::Value,
    ) -> LogEntry {
        let metadata = match metadata {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        let entry = LogEntry {
            id: Uuid::new_v4(),
            level,
            message: message.to_string(),
            at: Utc::now(),
            session_id: self.session_id.clone(),
            turn_id: scope.turn_id.clone(),
            request_id: scope.request_id.clone(),
            metadata,
        };
        mirror(&entry);

        let mut entries = self.entries.lock();
        entries.push_back(entry.clone());
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        entry
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn mirror(entry: &LogEntry) {
    let metadata = serde_json::Value::Object(entry.metadata.clone());
    let turn_id = entry.turn_id.as_deref().unwrap_or("");
    let request_id = entry.request_id.as_deref().unwrap_or("");
    match entry.level {
        LogLevel::Info => tracing::info!(
            session_id = %entry.session_id,
            turn_id,
            request_id,
            metadata = %metadata,
            "{}",
            entry.message
        ),
        LogLevel::Error => tracing::error!(
            session_id = %entry.session_id,
            turn_id,
            request_id,
            metadata = %metadata,
            "{}",
            entry.message
        ),
    }
}
