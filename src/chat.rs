//! File-backed chat sessions.
//!
//! One JSON file per session under `<home>/chats/<ID>.json`. Every mutation
//! applies the truncation policy and rewrites the file atomically; the file is
//! the only copy. IDs are three characters from `A-Z0-9`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::providers::ProviderName;
use crate::resolve::DispatchTarget;
use crate::storage;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_LEN: usize = 3;
const ID_ATTEMPTS: usize = 100;
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounds on retained history. Oldest messages go first; the newest is always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruncationPolicy {
    pub max_messages: usize,
    /// Sum of message content lengths, in bytes.
    pub max_chars: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            max_messages: 10,
            max_chars: 4000,
        }
    }
}

impl TruncationPolicy {
    /// Drop from the front until both bounds hold. Returns how many were dropped.
    pub fn apply(&self, messages: &mut Vec<Message>) -> usize {
        let mut total: usize = messages.iter().map(|m| m.content.len()).sum();
        let mut drop = 0;
        while messages.len() - drop > 1
            && (messages.len() - drop > self.max_messages || total > self.max_chars)
        {
            total -= messages[drop].content.len();
            drop += 1;
        }
        messages.drain(..drop);
        drop
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub provider: ProviderName,
    pub model: String,
    /// Alias the session was started (or last continued) with.
    pub alias: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    fn new(id: String, target: &DispatchTarget) -> Self {
        let now = Utc::now();
        Self {
            id,
            provider: target.provider,
            model: target.model.clone(),
            alias: target.alias.clone(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn target(&self) -> DispatchTarget {
        DispatchTarget {
            alias: self.alias.clone(),
            provider: self.provider,
            model: self.model.clone(),
        }
    }

    /// Continue with a different model; history is kept.
    pub fn retarget(&mut self, target: &DispatchTarget) {
        self.provider = target.provider;
        self.model = target.model.clone();
        self.alias = target.alias.clone();
    }

    fn push(&mut self, role: Role, content: &str) {
        let now = Utc::now();
        self.messages.push(Message {
            role,
            content: content.to_string(),
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// History as `ROLE: content` blocks separated by blank lines.
    pub fn format(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Prompt sent to the provider: prior history, then the new user turn.
    pub fn compose_prompt(&self, prompt: &str) -> String {
        if self.messages.is_empty() {
            return prompt.to_string();
        }
        format!(
            "{}\n\n{}: {prompt}\n\n{}:",
            self.format(),
            Role::User.label(),
            Role::Assistant.label()
        )
    }

    pub fn summary(&self) -> SessionSummary {
        let preview = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| preview(&m.content))
            .unwrap_or_default();
        SessionSummary {
            id: self.id.clone(),
            alias: self.alias.clone(),
            provider: self.provider,
            model: self.model.clone(),
            messages: self.messages.len(),
            updated_at: self.updated_at,
            preview,
        }
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
    format!("{cut}...")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub alias: String,
    pub provider: ProviderName,
    pub model: String,
    pub messages: usize,
    pub updated_at: DateTime<Utc>,
    pub preview: String,
}

/// Upper-cased ID if it has the right shape.
pub fn normalize_id(raw: &str) -> Result<String> {
    let id = raw.trim().to_ascii_uppercase();
    if id.len() == ID_LEN && id.bytes().all(|b| ID_ALPHABET.contains(&b)) {
        Ok(id)
    } else {
        Err(AiError::Usage(format!(
            "invalid chat ID '{raw}': expected {ID_LEN} letters or digits"
        )))
    }
}

pub fn looks_like_id(raw: &str) -> bool {
    normalize_id(raw).is_ok()
}

pub struct ChatStore {
    dir: PathBuf,
    policy: TruncationPolicy,
}

impl ChatStore {
    pub fn new(dir: impl Into<PathBuf>, policy: TruncationPolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn exists(&self, id: &str) -> bool {
        self.path_for(id).exists()
    }

    fn allocate_id(&self) -> Result<String> {
        let mut rng = rand::thread_rng();
        for _ in 0..ID_ATTEMPTS {
            let id: String = (0..ID_LEN)
                .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
                .collect();
            if !self.exists(&id) {
                return Ok(id);
            }
        }
        Err(AiError::Config(format!(
            "could not allocate a free chat ID after {ID_ATTEMPTS} attempts"
        )))
    }

    /// New session with a fresh ID, persisted immediately.
    pub fn create(&self, target: &DispatchTarget) -> Result<ChatSession> {
        let id = self.allocate_id()?;
        let session = ChatSession::new(id, target);
        self.save(&session)?;
        tracing::debug!(id = %session.id, alias = %session.alias, "chat session created");
        Ok(session)
    }

    pub fn load(&self, id: &str) -> Result<ChatSession> {
        let id = normalize_id(id)?;
        storage::read_record(&self.path_for(&id))?.ok_or(AiError::NotFound {
            what: "chat session",
            id,
        })
    }

    pub fn save(&self, session: &ChatSession) -> Result<()> {
        storage::write_record(&self.path_for(&session.id), session)
    }

    pub fn append(&self, session: &mut ChatSession, role: Role, content: &str) -> Result<()> {
        session.push(role, content);
        self.truncate_and_save(session)
    }

    /// Append a user turn and its reply as one persisted update.
    pub fn record_exchange(
        &self,
        session: &mut ChatSession,
        prompt: &str,
        reply: &str,
    ) -> Result<()> {
        session.push(Role::User, prompt);
        session.push(Role::Assistant, reply);
        self.truncate_and_save(session)
    }

    fn truncate_and_save(&self, session: &mut ChatSession) -> Result<()> {
        let dropped = self.policy.apply(&mut session.messages);
        if dropped > 0 {
            tracing::debug!(id = %session.id, dropped, "chat history truncated");
        }
        self.save(session)
    }

    /// All readable sessions, most recently updated first.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut sessions = self.load_all()?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions.iter().map(ChatSession::summary).collect())
    }

    pub fn latest(&self) -> Result<Option<ChatSession>> {
        Ok(self
            .load_all()?
            .into_iter()
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| b.id.cmp(&a.id))))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let id = normalize_id(id)?;
        let path = self.path_for(&id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(%id, "chat session deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AiError::NotFound {
                what: "chat session",
                id,
            }),
            Err(e) => Err(AiError::io(path, e)),
        }
    }

    fn load_all(&self) -> Result<Vec<ChatSession>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AiError::io(&self.dir, e)),
        };
        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_session = path.extension().is_some_and(|e| e == "json")
                && path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(looks_like_id);
            if !is_session {
                continue;
            }
            match storage::read_record::<ChatSession>(&path) {
                Ok(Some(s)) => sessions.push(s),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable chat session"),
            }
        }
        Ok(sessions)
    }
}
