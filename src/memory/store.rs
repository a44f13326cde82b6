use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access conversation store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode conversation store: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    fn new(id: String) -> Self {
        let now = now_timestamp();
        Self {
            id,
            created_at: now.clone(),
            updated_at: now,
            messages: Vec::new(),
        }
    }
}

/// Sortable ISO-8601 timestamp with enough resolution to double as a
/// practically unique conversation id.
fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Conversation history persisted as a single JSON array of conversations.
///
/// The whole collection is loaded at startup and rewritten on every
/// mutation, via a temp file renamed over the target so a failed write
/// leaves the previous file intact. Mutations serialize behind one async
/// lock; concurrent appends to different conversations cannot lose updates.
pub struct MemoryStore {
    path: PathBuf,
    conversations: Mutex<Vec<Conversation>>,
}

impl MemoryStore {
    /// Open the store, creating an empty `[]` file (and parent directories)
    /// if none exists yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        }

        if !path.exists() {
            fs::write(&path, "[]").map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        }

        let content = fs::read_to_string(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        let conversations = match serde_json::from_str(&content) {
            Ok(conversations) => conversations,
            Err(e) => {
                // A corrupt store file should not brick the assistant;
                // start empty and let the next write replace it.
                tracing::warn!(path = %path.display(), error = %e, "conversation store unreadable, starting empty");
                Vec::new()
            }
        };

        Ok(Self {
            path,
            conversations: Mutex::new(conversations),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a conversation, deriving a timestamp id when none is given.
    /// Creating an id that already exists returns it unchanged.
    pub async fn create(&self, conversation_id: Option<String>) -> Result<String, StorageError> {
        let id = conversation_id.unwrap_or_else(now_timestamp);

        let mut conversations = self.conversations.lock().await;
        if !conversations.iter().any(|c| c.id == id) {
            conversations.push(Conversation::new(id.clone()));
            self.persist(&conversations)?;
        }

        Ok(id)
    }

    /// Append a message, implicitly creating the conversation if the id is
    /// unknown. The store file is rewritten before this returns; an error
    /// means the message was not durably recorded.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), StorageError> {
        let mut conversations = self.conversations.lock().await;

        let idx = match conversations.iter().position(|c| c.id == conversation_id) {
            Some(idx) => idx,
            None => {
                conversations.push(Conversation::new(conversation_id.to_string()));
                conversations.len() - 1
            }
        };

        let now = now_timestamp();
        let conversation = &mut conversations[idx];

        conversation.messages.push(Message {
            role,
            content: content.to_string(),
            timestamp: now.clone(),
        });
        conversation.updated_at = now;

        self.persist(&conversations)
    }

    pub async fn get(&self, conversation_id: &str) -> Option<Conversation> {
        let conversations = self.conversations.lock().await;
        conversations.iter().find(|c| c.id == conversation_id).cloned()
    }

    /// Most recent `limit` messages in chronological order, or the full
    /// history when no limit is given. Empty for unknown ids.
    pub async fn history(&self, conversation_id: &str, limit: Option<usize>) -> Vec<Message> {
        let conversations = self.conversations.lock().await;
        let Some(conversation) = conversations.iter().find(|c| c.id == conversation_id) else {
            return Vec::new();
        };

        let messages = &conversation.messages;
        let start = limit.map_or(0, |limit| messages.len().saturating_sub(limit));
        messages[start..].to_vec()
    }

    /// Returns true if the conversation existed and was removed.
    pub async fn delete(&self, conversation_id: &str) -> Result<bool, StorageError> {
        let mut conversations = self.conversations.lock().await;
        let before = conversations.len();
        conversations.retain(|c| c.id != conversation_id);

        if conversations.len() == before {
            return Ok(false);
        }

        self.persist(&conversations)?;
        Ok(true)
    }

    fn persist(&self, conversations: &[Conversation]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(conversations)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (MemoryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::open(temp_dir.path().join("conversations.json")).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn open_initializes_empty_store_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("memory").join("conversations.json");

        let store = MemoryStore::open(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(store.get("anything").await.is_none());
    }

    #[tokio::test]
    async fn create_with_derived_id_persists_immediately() {
        let (store, _temp) = create_test_store();

        let id = store.create(None).await.unwrap();

        assert!(!id.is_empty());
        let reloaded = MemoryStore::open(store.path()).unwrap();
        assert!(reloaded.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn create_existing_id_is_idempotent() {
        let (store, _temp) = create_test_store();

        store.create(Some("c1".to_string())).await.unwrap();
        store.append_message("c1", Role::User, "hi").await.unwrap();
        store.create(Some("c1".to_string())).await.unwrap();

        assert_eq!(store.history("c1", None).await.len(), 1);
    }

    #[tokio::test]
    async fn append_auto_vivifies_unknown_conversation() {
        let (store, _temp) = create_test_store();

        store.append_message("fresh", Role::User, "hello").await.unwrap();

        let conversation = store.get("fresh").await.unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn round_trip_preserves_order_roles_and_content() {
        let (store, _temp) = create_test_store();

        store.create(Some("c1".to_string())).await.unwrap();
        store.append_message("c1", Role::User, "first").await.unwrap();
        store.append_message("c1", Role::Assistant, "second").await.unwrap();
        store.append_message("c1", Role::System, "third").await.unwrap();

        let reloaded = MemoryStore::open(store.path()).unwrap();
        let history = reloaded.history("c1", None).await;

        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().map(|m| (m.role, m.content.as_str())).collect::<Vec<_>>(),
            vec![
                (Role::User, "first"),
                (Role::Assistant, "second"),
                (Role::System, "third"),
            ]
        );
    }

    #[tokio::test]
    async fn history_limit_returns_most_recent_in_order() {
        let (store, _temp) = create_test_store();

        for i in 0..5 {
            store
                .append_message("c1", Role::User, &format!("m{}", i))
                .await
                .unwrap();
        }

        let history = store.history("c1", Some(2)).await;
        assert_eq!(
            history.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["m3", "m4"]
        );
    }

    #[tokio::test]
    async fn history_of_unknown_conversation_is_empty() {
        let (store, _temp) = create_test_store();
        assert!(store.history("nope", None).await.is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_returns_false_and_leaves_store_unchanged() {
        let (store, _temp) = create_test_store();
        store.append_message("keep", Role::User, "hi").await.unwrap();

        assert!(!store.delete("nope").await.unwrap());
        assert!(store.get("keep").await.is_some());
    }

    #[tokio::test]
    async fn delete_known_removes_conversation() {
        let (store, _temp) = create_test_store();
        store.append_message("gone", Role::User, "hi").await.unwrap();

        assert!(store.delete("gone").await.unwrap());
        assert!(store.get("gone").await.is_none());

        let reloaded = MemoryStore::open(store.path()).unwrap();
        assert!(reloaded.get("gone").await.is_none());
    }

    #[tokio::test]
    async fn updated_at_refreshes_on_append() {
        let (store, _temp) = create_test_store();

        store.create(Some("c1".to_string())).await.unwrap();
        let created = store.get("c1").await.unwrap();

        store.append_message("c1", Role::User, "hi").await.unwrap();
        let updated = store.get("c1").await.unwrap();

        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn corrupt_store_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conversations.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = MemoryStore::open(&path).unwrap();
        assert!(store.history("c1", None).await.is_empty());
    }

    #[tokio::test]
    async fn append_fails_when_store_directory_is_gone() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sub");
        let store = MemoryStore::open(dir.join("conversations.json")).unwrap();

        std::fs::remove_dir_all(&dir).unwrap();

        let result = store.append_message("c1", Role::User, "hi").await;
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }
}
