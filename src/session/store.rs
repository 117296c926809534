//! Credential persistence and change notification

use crate::error::{FeedError, FeedResult};
use crate::model::UserId;
use crate::session::token::decode_user_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::fs;
use tracing::{debug, info};

/// Handle returned by [`SessionStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// On-disk form of the session
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(rename = "userToken")]
    user_token: String,

    saved_at: DateTime<Utc>,
}

/// Process-wide holder of the auth credential
///
/// Cloning is cheap; every clone shares the same credential and listeners.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    credential: RwLock<Option<String>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl SessionStore {
    /// Open the store, restoring a credential persisted at `path`
    pub async fn open(path: impl Into<PathBuf>) -> FeedResult<Self> {
        let path = path.into();
        let credential = Self::load(&path).await?;
        if credential.is_some() {
            debug!("Restored credential from {}", path.display());
        }

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                credential: RwLock::new(credential),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    async fn load(path: &Path) -> FeedResult<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FeedError::io(format!("reading session file {}", path.display()), e))?;

        let persisted: PersistedSession = serde_json::from_str(&content)?;
        Ok(normalize(Some(persisted.user_token)))
    }

    /// Current credential, if logged in
    pub fn credential(&self) -> Option<String> {
        self.inner
            .credential
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }

    /// User id carried by the current credential, if it can be decoded
    pub fn current_user_id(&self) -> Option<UserId> {
        self.credential().as_deref().and_then(decode_user_id)
    }

    /// Replace the credential, persist it, then notify subscribers
    ///
    /// `None` (or a blank token) logs out and removes the persisted file.
    pub async fn set_credential(&self, token: Option<String>) -> FeedResult<()> {
        let token = normalize(token);
        self.persist(token.as_deref()).await?;

        let changed = {
            let mut current = self
                .inner
                .credential
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let changed = *current != token;
            *current = token.clone();
            changed
        };

        if changed {
            info!(
                "Session {}",
                if token.is_some() { "started" } else { "cleared" }
            );
            self.notify(token.as_deref());
        }
        Ok(())
    }

    /// Register a listener called synchronously on every credential change
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners().retain(|(existing, _)| *existing != id);
    }

    /// Where the credential is persisted
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn listeners(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, token: Option<&str>) {
        // Listeners run outside the lock so they may (un)subscribe.
        let listeners: Vec<Listener> = self.listeners().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(token);
        }
    }

    async fn persist(&self, token: Option<&str>) -> FeedResult<()> {
        let path = &self.inner.path;

        let Some(token) = token else {
            if path.exists() {
                fs::remove_file(path).await.map_err(|e| {
                    FeedError::io(format!("removing session file {}", path.display()), e)
                })?;
            }
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FeedError::io("creating state directory", e))?;
        }

        let record = PersistedSession {
            user_token: token.to_string(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&record)?;
        fs::write(path, content)
            .await
            .map_err(|e| FeedError::SessionPersist(format!("{}: {}", path.display(), e)))?;

        // The token grants full account access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms)
                .map_err(|e| FeedError::io("setting session file permissions", e))?;
        }

        Ok(())
    }
}

fn normalize(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::token::fake_jwt;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    async fn test_store() -> (SessionStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::open(temp.path().join("session.json"))
            .await
            .unwrap();
        (store, temp)
    }

    #[tokio::test]
    async fn starts_logged_out() {
        let (store, _temp) = test_store().await;
        assert!(store.credential().is_none());
        assert!(!store.is_authenticated());
        assert!(store.current_user_id().is_none());
    }

    #[tokio::test]
    async fn credential_survives_reopen() {
        let (store, _temp) = test_store().await;
        store.set_credential(Some("tok-1".to_string())).await.unwrap();

        let reopened = SessionStore::open(store.path()).await.unwrap();
        assert_eq!(reopened.credential().as_deref(), Some("tok-1"));

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\"userToken\""));
    }

    #[tokio::test]
    async fn clearing_removes_file() {
        let (store, _temp) = test_store().await;
        store.set_credential(Some("tok-1".to_string())).await.unwrap();
        store.set_credential(None).await.unwrap();

        assert!(!store.path().exists());
        let reopened = SessionStore::open(store.path()).await.unwrap();
        assert!(reopened.credential().is_none());
    }

    #[tokio::test]
    async fn blank_token_is_logout() {
        let (store, _temp) = test_store().await;
        store.set_credential(Some("tok".to_string())).await.unwrap();
        store.set_credential(Some("   ".to_string())).await.unwrap();
        assert!(store.credential().is_none());
    }

    #[tokio::test]
    async fn listeners_notified_on_change_only() {
        let (store, _temp) = test_store().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set_credential(Some("a".to_string())).await.unwrap();
        store.set_credential(Some("a".to_string())).await.unwrap();
        store.set_credential(None).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        store.unsubscribe(id);
        store.set_credential(Some("b".to_string())).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn user_id_from_token() {
        let (store, _temp) = test_store().await;
        let token = fake_jwt(&serde_json::json!({"user": "u7"}));
        store.set_credential(Some(token)).await.unwrap();
        assert_eq!(store.current_user_id(), Some(UserId::new("u7")));

        store.set_credential(Some("opaque".to_string())).await.unwrap();
        assert!(store.current_user_id().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (store, _temp) = test_store().await;
        store.set_credential(Some("tok".to_string())).await.unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SessionStore::open(&path).await.is_err());
    }
}
