//! Per-persona conversation history — turns, the store seam, and replay.
//!
//! The remote store is an append-only log keyed by persona id. When no remote
//! store is configured the app falls back to [`MemoryHistory`], which keeps
//! the same contract for the life of the process.

pub mod upstash;

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role implied by a turn's position in a replayed history.
    pub fn for_position(index: usize) -> Role {
        if index % 2 == 0 { Role::User } else { Role::Assistant }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Ai",
        }
    }
}

/// One message in a persona's conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only, persona-keyed turn log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one turn to the end of the persona's log.
    async fn append(&self, persona: Persona, turn: &Turn) -> Result<()>;
    /// Every turn for the persona, oldest first.
    async fn fetch(&self, persona: Persona) -> Result<Vec<Turn>>;
    /// Drop the persona's whole log.
    async fn clear(&self, persona: Persona) -> Result<()>;
    /// Short label for the status bar.
    fn label(&self) -> String;
}

/// Re-tag turns by position parity, starting with the user at index 0.
pub fn replay(turns: Vec<Turn>) -> Vec<Turn> {
    turns
        .into_iter()
        .enumerate()
        .map(|(index, turn)| Turn {
            role: Role::for_position(index),
            content: turn.content,
        })
        .collect()
}

/// In-process history used when no remote store is configured.
#[derive(Default)]
pub struct MemoryHistory {
    logs: Mutex<HashMap<Persona, Vec<Turn>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, persona: Persona, turn: &Turn) -> Result<()> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        logs.entry(persona).or_default().push(turn.clone());
        Ok(())
    }

    async fn fetch(&self, persona: Persona) -> Result<Vec<Turn>> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        Ok(logs.get(&persona).cloned().unwrap_or_default())
    }

    async fn clear(&self, persona: Persona) -> Result<()> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        logs.remove(&persona);
        Ok(())
    }

    fn label(&self) -> String {
        "memory".to_string()
    }
}
