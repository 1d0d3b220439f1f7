//! Typed access to the persisted session record.

use crate::{KeyValueStore, StorageError, StorageKeys, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// The three persisted session fields.
///
/// Each field is stored under its own key, so a record read back from a
/// backend that was interrupted mid-write may have any subset present.
/// Callers decide what a partial record means; see [`PersistedSession::into_complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession<U> {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<U>,
}

impl<U> Default for PersistedSession<U> {
    fn default() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            user: None,
        }
    }
}

impl<U> PersistedSession<U> {
    /// A record with every field set.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>, user: U) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            user: Some(user),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    /// Every field present, with both tokens non-empty.
    pub fn is_complete(&self) -> bool {
        has_token(&self.access_token) && has_token(&self.refresh_token) && self.user.is_some()
    }

    /// Returns `(access_token, refresh_token, user)` only when the record is
    /// complete. An empty token string counts as missing.
    pub fn into_complete(self) -> Option<(String, String, U)> {
        let access = self.access_token.filter(|t| !t.is_empty())?;
        let refresh = self.refresh_token.filter(|t| !t.is_empty())?;
        Some((access, refresh, self.user?))
    }
}

fn has_token(token: &Option<String>) -> bool {
    token.as_deref().is_some_and(|t| !t.is_empty())
}

/// Load, save and clear the session record on top of any [`KeyValueStore`].
pub struct SessionStore {
    storage: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Read the record. Missing keys come back as `None`. A user field that no
    /// longer deserializes is treated as missing rather than failing the load.
    pub fn load<U: DeserializeOwned>(&self) -> StorageResult<PersistedSession<U>> {
        let access_token = self.storage.get(StorageKeys::ACCESS_TOKEN)?;
        let refresh_token = self.storage.get(StorageKeys::REFRESH_TOKEN)?;
        let user = match self.storage.get(StorageKeys::USER)? {
            Some(raw) => match serde_json::from_str::<U>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Stored user record is unreadable, ignoring it");
                    None
                }
            },
            None => None,
        };

        Ok(PersistedSession {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Write the record. Present fields are set and absent fields removed in
    /// one batch.
    ///
    /// On a backend without atomic batches the access token is removed first
    /// and written last, so an interrupted save never leaves a record that
    /// pairs a new access token with stale fields.
    pub fn save<U: Serialize>(&self, record: &PersistedSession<U>) -> StorageResult<()> {
        let user_json = record
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let mut set: Vec<(&str, &str)> = Vec::with_capacity(3);
        let mut delete: Vec<&str> = Vec::new();

        let fields = [
            (StorageKeys::REFRESH_TOKEN, record.refresh_token.as_deref()),
            (StorageKeys::USER, user_json.as_deref()),
            (StorageKeys::ACCESS_TOKEN, record.access_token.as_deref()),
        ];
        for (key, value) in fields {
            match value {
                Some(value) => set.push((key, value)),
                None => delete.push(key),
            }
        }

        if !self.storage.atomic_batches() {
            self.storage.delete(StorageKeys::ACCESS_TOKEN)?;
        }
        self.storage.write_batch(&set, &delete)?;

        debug!(fields = set.len(), "Session record saved");
        Ok(())
    }

    /// Remove all three fields. The access token goes first, so an
    /// interrupted clear still reads back as signed out.
    pub fn clear(&self) -> StorageResult<()> {
        self.storage.write_batch(&[], &StorageKeys::SESSION_KEYS)?;
        debug!("Session record cleared");
        Ok(())
    }
}
