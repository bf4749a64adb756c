use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

/// Access token lifetime in minutes, mirrored from the server.
const TOKEN_LIFETIME_MINUTES: i64 = 30;

/// Read/write/clear access to the single stored access token.
///
/// Exactly one token is current at a time: `store` replaces it wholesale and
/// `clear` removes it (logout, or terminal refresh failure). The gateway
/// takes this as a trait object so tests can inject an in-memory store.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn store(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    /// Whether the token has outlived the server-side lifetime. Diagnostic
    /// only - the gateway recovers reactively when the server says so.
    pub fn is_stale(&self) -> bool {
        Utc::now() > self.created_at + Duration::minutes(TOKEN_LIFETIME_MINUTES)
    }

    /// Minutes remaining until the token goes stale (for display)
    pub fn minutes_until_stale(&self) -> i64 {
        let stale_at = self.created_at + Duration::minutes(TOKEN_LIFETIME_MINUTES);
        (stale_at - Utc::now()).num_minutes().max(0)
    }
}

/// File-backed token store persisting the session under the cache dir.
pub struct SessionStore {
    path: PathBuf,
    data: Mutex<Option<SessionData>>,
}

impl SessionStore {
    /// Open the store, loading a previously persisted session if present.
    /// An unreadable session file is treated as logged-out, not fatal.
    pub fn open(cache_dir: PathBuf) -> Self {
        let path = cache_dir.join(SESSION_FILE);
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => Some(data),
                Err(err) => {
                    warn!(error = %err, "Ignoring unparseable session file");
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Snapshot of the current session, if any.
    pub fn session(&self) -> Option<SessionData> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn persist(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl TokenStore for SessionStore {
    fn access_token(&self) -> Option<String> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.access_token.clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        let data = SessionData {
            access_token: token.to_string(),
            created_at: Utc::now(),
        };
        self.persist(&data)?;
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(data);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// In-memory token store for tests and embedding.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: Mutex::new(token.map(str::to_string)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("smartcart-session-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn test_memory_store_single_current_token() {
        let store = MemoryTokenStore::default();
        assert!(store.access_token().is_none());

        store.store("T1").unwrap();
        store.store("T2").unwrap();
        assert_eq!(store.access_token().as_deref(), Some("T2"));

        store.clear().unwrap();
        assert!(store.access_token().is_none());
    }

    #[test]
    fn test_session_staleness() {
        let fresh = SessionData {
            access_token: "T1".to_string(),
            created_at: Utc::now(),
        };
        assert!(!fresh.is_stale());
        assert!(fresh.minutes_until_stale() > 0);

        let stale = SessionData {
            access_token: "T1".to_string(),
            created_at: Utc::now() - Duration::minutes(TOKEN_LIFETIME_MINUTES + 1),
        };
        assert!(stale.is_stale());
        assert_eq!(stale.minutes_until_stale(), 0);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = scratch_dir("roundtrip");
        let _ = std::fs::remove_dir_all(&dir);

        let store = SessionStore::open(dir.clone());
        assert!(store.access_token().is_none());
        store.store("T1").unwrap();

        // A fresh store picks the persisted session back up
        let reopened = SessionStore::open(dir.clone());
        assert_eq!(reopened.access_token().as_deref(), Some("T1"));
        assert!(reopened.session().is_some_and(|s| !s.is_stale()));

        reopened.clear().unwrap();
        let cleared = SessionStore::open(dir.clone());
        assert!(cleared.access_token().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_session_file_is_ignored() {
        let dir = scratch_dir("corrupt");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SESSION_FILE), "not json").unwrap();

        let store = SessionStore::open(dir.clone());
        assert!(store.access_token().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
