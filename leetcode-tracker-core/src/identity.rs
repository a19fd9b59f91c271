//! Identity cache: the authenticated token and username used by every remote call.
//!
//! Stored under two keys, the token on its own and the user record next to it,
//! so a token can be cached before its username is known.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::contract::{KeyValueStore, StoreError};

pub const TOKEN_KEY: &str = "githubToken";
pub const USER_KEY: &str = "githubUser";

/// Token plus the login name of its owner.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub token: String,
    pub username: String,
}

impl Identity {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredUser {
    login: String,
}

/// Reads and writes the [`Identity`] through a [`KeyValueStore`].
///
/// No expiry or refresh: an expired token only shows up as a failing remote call.
pub struct IdentityCache<S> {
    store: S,
}

impl<S: KeyValueStore> IdentityCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Both token and username, or `None` if either is missing.
    pub async fn get_identity(&self) -> Result<Option<Identity>, StoreError> {
        let token = match self.get_token().await? {
            Some(token) => token,
            None => return Ok(None),
        };
        let username = match self.get_username().await? {
            Some(username) => username,
            None => return Ok(None),
        };
        Ok(Some(Identity { token, username }))
    }

    pub async fn set_identity(&self, identity: Identity) -> Result<(), StoreError> {
        info!(username = %identity.username, "Storing identity");
        self.store
            .set(TOKEN_KEY, Value::String(identity.token))
            .await?;
        self.set_username(&identity.username).await
    }

    pub async fn get_token(&self) -> Result<Option<String>, StoreError> {
        match self.store.get(TOKEN_KEY).await? {
            Some(Value::String(token)) if !token.is_empty() => Ok(Some(token)),
            Some(other) => {
                warn!(value_type = %json_type(&other), "Stored token is not a non-empty string, ignoring");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn set_token(&self, token: &str) -> Result<(), StoreError> {
        debug!("Storing token");
        self.store
            .set(TOKEN_KEY, Value::String(token.to_string()))
            .await
    }

    pub async fn get_username(&self) -> Result<Option<String>, StoreError> {
        let raw = match self.store.get(USER_KEY).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_value::<StoredUser>(raw) {
            Ok(user) if !user.login.is_empty() => Ok(Some(user.login)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(error = %e, "Stored user record is malformed, ignoring");
                Ok(None)
            }
        }
    }

    pub async fn set_username(&self, username: &str) -> Result<(), StoreError> {
        let user = serde_json::to_value(StoredUser {
            login: username.to_string(),
        })?;
        self.store.set(USER_KEY, user).await
    }

    /// Logout: wipes the whole backing store.
    pub async fn clear(&self) -> Result<(), StoreError> {
        info!("Clearing identity storage");
        self.store.clear().await
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// In-memory [`KeyValueStore`]; lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| format!("failed to acquire read lock: {e}"))?;
        Ok(inner.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| format!("failed to acquire write lock: {e}"))?;
        inner.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| format!("failed to acquire write lock: {e}"))?;
        inner.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| format!("failed to acquire write lock: {e}"))?;
        inner.clear();
        Ok(())
    }
}
