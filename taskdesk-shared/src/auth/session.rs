/// Persisted session slot
///
/// A device has at most one active identity. The slot holds that identity's
/// `UserId` and survives restarts until an explicit logout clears it.
///
/// - [`MemorySessionStore`]: process-local slot, used by tests
/// - [`FileSessionStore`]: JSON file, written atomically via temp file + rename
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::session::{MemorySessionStore, SessionStore};
/// use taskdesk_shared::models::user::UserId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sessions = MemorySessionStore::new();
/// let id = UserId::new();
///
/// sessions.set(id).await?;
/// assert_eq!(sessions.get().await?, Some(id));
///
/// sessions.clear().await?;
/// assert_eq!(sessions.get().await?, None);
/// # Ok(())
/// # }
/// ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::user::UserId;
use crate::store::StoreError;

/// Durable "current user" slot
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self) -> Result<Option<UserId>, StoreError>;

    async fn set(&self, user_id: UserId) -> Result<(), StoreError>;

    /// Clears the slot; clearing an empty slot is not an error
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Session slot kept in memory
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: RwLock<Option<UserId>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self) -> Result<Option<UserId>, StoreError> {
        Ok(*self.current.read().await)
    }

    async fn set(&self, user_id: UserId) -> Result<(), StoreError> {
        *self.current.write().await = Some(user_id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.current.write().await = None;
        Ok(())
    }
}

/// On-disk layout of the session file
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    current_user_id: Option<UserId>,
}

/// Session slot persisted as a small JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Uses `path` for the session file; parent directories are created on
    /// first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, contents: &SessionFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let encoded = serde_json::to_vec_pretty(contents)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self) -> Result<Option<UserId>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<SessionFile>(&bytes) {
            Ok(file) => Ok(file.current_user_id),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable session file"
                );
                Ok(None)
            }
        }
    }

    async fn set(&self, user_id: UserId) -> Result<(), StoreError> {
        self.write(&SessionFile {
            current_user_id: Some(user_id),
        })
        .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.write(&SessionFile::default()).await
    }
}
