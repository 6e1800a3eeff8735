//! Chat transcripts and where they are kept

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid session file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session file for {id} belongs to session {found}")]
    IdConflict { id: String, found: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// Turn payload: plain text, or a structured answer object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Structured(serde_json::Value),
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        TurnContent::Text(text.to_string())
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        TurnContent::Text(text)
    }
}

impl From<serde_json::Value> for TurnContent {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => TurnContent::Text(text),
            other => TurnContent::Structured(other),
        }
    }
}

/// One message in a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
    pub timestamp: DateTime<Local>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<TurnContent>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, TurnContent::Text(text.into()))
    }

    pub fn assistant(content: impl Into<TurnContent>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered record of a conversation. Turns are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    turns: Vec<Turn>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Transcript {
    /// Empty transcript with a random id
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            id: id.into(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.updated_at = turn.timestamp;
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage for transcripts
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<Transcript>>;
    async fn save(&self, transcript: &Transcript) -> Result<()>;
    async fn list(&self) -> Result<Vec<String>>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Keeps transcripts for the life of the process
#[derive(Default)]
pub struct MemoryStore {
    transcripts: RwLock<HashMap<String, Transcript>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<Transcript>> {
        Ok(self.transcripts.read().await.get(id).cloned())
    }

    async fn save(&self, transcript: &Transcript) -> Result<()> {
        self.transcripts
            .write()
            .await
            .insert(transcript.id.clone(), transcript.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.transcripts.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.transcripts.write().await.remove(id).is_some())
    }
}

/// One JSON file per transcript
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the store, making the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn transcript_path(&self, id: &str) -> PathBuf {
        let safe: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    /// Read the transcript stored at `id`'s path, if any.
    ///
    /// Distinct ids can share a sanitized file name, so the stored id
    /// must match.
    async fn read_own(&self, id: &str) -> Result<Option<Transcript>> {
        let path = self.transcript_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let transcript: Transcript = serde_json::from_str(&content)?;
        if transcript.id != id {
            return Err(SessionError::IdConflict {
                id: id.to_string(),
                found: transcript.id,
            });
        }
        Ok(Some(transcript))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self, id: &str) -> Result<Option<Transcript>> {
        let transcript = self.read_own(id).await?;
        if let Some(transcript) = &transcript {
            debug!("Loaded transcript {} ({} turns)", id, transcript.len());
        }
        Ok(transcript)
    }

    async fn save(&self, transcript: &Transcript) -> Result<()> {
        let path = self.transcript_path(&transcript.id);
        match self.read_own(&transcript.id).await {
            Ok(_) | Err(SessionError::Json(_)) => {}
            Err(e) => return Err(e),
        }
        let content = serde_json::to_string_pretty(transcript)?;
        tokio::fs::write(path, content).await?;
        debug!("Saved transcript: {}", transcript.id);
        Ok(())
    }

    /// Ids of readable transcripts, sorted
    async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<Transcript>(&content) {
                    Ok(transcript) => ids.push(transcript.id),
                    Err(e) => warn!("Skipping unreadable transcript {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read {:?}: {}", path, e),
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        match self.read_own(id).await {
            Ok(None) => Ok(false),
            Ok(Some(_)) | Err(SessionError::Json(_)) => {
                tokio::fs::remove_file(self.transcript_path(id)).await?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}
