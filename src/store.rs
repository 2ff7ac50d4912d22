use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::installation::Installation;

/// Persists and loads per-team bot + user tokens. The core only ever reaches
/// the store through this trait; ownership of the underlying records is the
/// store's, not the core's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn save(&self, installation: Installation) -> Result<(), anyhow::Error>;

    async fn find_bot(
        &self,
        enterprise_id: Option<&str>,
        team_id: &str,
    ) -> Result<Option<Installation>, anyhow::Error>;

    async fn find_installer(
        &self,
        enterprise_id: Option<&str>,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<Installation>, anyhow::Error>;

    async fn delete_all(
        &self,
        enterprise_id: Option<&str>,
        team_id: &str,
    ) -> Result<(), anyhow::Error>;
}

/// Issues, looks up, and consumes one-time install-state tokens.
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    /// Issue a fresh state token. May attach a `Set-Cookie` to `response`
    /// (as `CookieOAuthStateStore` does) or persist server-side only (as
    /// `MemoryOAuthStateStore` does) — either is a valid implementation.
    async fn issue(&self) -> Result<String, anyhow::Error>;

    /// Single-use: returns `true` at most once per issued state. MUST be
    /// atomic — concurrent callers racing the same state must see at most
    /// one success.
    async fn consume(&self, state: &str) -> Result<bool, anyhow::Error>;
}

/// Reference `InstallationStore` backed by an in-process `Mutex<HashMap>`.
/// Not durable across restarts; intended as the crate's zero-config default
/// and as the store used throughout the test suite.
#[derive(Default)]
pub struct MemoryInstallationStore {
    installations: Mutex<HashMap<(Option<String>, String, Option<String>), Installation>>,
}

impl MemoryInstallationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstallationStore for MemoryInstallationStore {
    async fn save(&self, installation: Installation) -> Result<(), anyhow::Error> {
        let key = installation.key();
        self.installations
            .lock()
            .expect("installation store mutex poisoned")
            .insert(key, installation);
        Ok(())
    }

    async fn find_bot(
        &self,
        enterprise_id: Option<&str>,
        team_id: &str,
    ) -> Result<Option<Installation>, anyhow::Error> {
        let installations = self
            .installations
            .lock()
            .expect("installation store mutex poisoned");
        // A bot install is keyed with `user_id = None`; search for that
        // specific record first, then fall back to any record for the team
        // (covers stores seeded with only a per-installer record).
        let bot_key = (enterprise_id.map(str::to_string), team_id.to_string(), None);
        if let Some(found) = installations.get(&bot_key) {
            return Ok(Some(found.clone()));
        }
        Ok(installations
            .values()
            .find(|i| i.team_id == team_id && i.enterprise_id.as_deref() == enterprise_id)
            .cloned())
    }

    async fn find_installer(
        &self,
        enterprise_id: Option<&str>,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<Installation>, anyhow::Error> {
        let key = (
            enterprise_id.map(str::to_string),
            team_id.to_string(),
            Some(user_id.to_string()),
        );
        Ok(self
            .installations
            .lock()
            .expect("installation store mutex poisoned")
            .get(&key)
            .cloned())
    }

    async fn delete_all(
        &self,
        enterprise_id: Option<&str>,
        team_id: &str,
    ) -> Result<(), anyhow::Error> {
        self.installations
            .lock()
            .expect("installation store mutex poisoned")
            .retain(|(ent, team, _), _| !(team == team_id && ent.as_deref() == enterprise_id));
        Ok(())
    }
}

struct OAuthStateEntry {
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

/// Reference `OAuthStateStore` backed by an in-process `Mutex<HashMap>`.
/// `consume` removes/marks the entry inside the same lock acquisition that
/// checks expiry, so two concurrent callers racing the same state can never
/// both succeed.
pub struct MemoryOAuthStateStore {
    states: Mutex<HashMap<String, OAuthStateEntry>>,
    ttl: Duration,
}

impl MemoryOAuthStateStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }
}

impl Default for MemoryOAuthStateStore {
    fn default() -> Self {
        Self::new(600)
    }
}

#[async_trait]
impl OAuthStateStore for MemoryOAuthStateStore {
    async fn issue(&self) -> Result<String, anyhow::Error> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        let now = Utc::now();
        self.states.lock().expect("state store mutex poisoned").insert(
            token.clone(),
            OAuthStateEntry {
                issued_at: now,
                expires_at: now + self.ttl,
                consumed: false,
            },
        );
        Ok(token)
    }

    async fn consume(&self, state: &str) -> Result<bool, anyhow::Error> {
        let mut states = self.states.lock().expect("state store mutex poisoned");
        match states.get_mut(state) {
            Some(entry) if !entry.consumed && entry.expires_at > Utc::now() => {
                entry.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
