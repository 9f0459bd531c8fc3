//! Short-lived response cache shared by in-flight requests.

use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// String-keyed store of JSON values that expire after a fixed TTL.
///
/// Writers race with last-writer-wins semantics; there is no capacity bound,
/// expired entries are dropped lazily on access and on every write.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key` if present, unexpired and still
    /// decodable as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let value = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
                Some(_) => None,
                None => return None,
            }
        };

        match value {
            Some(v) => serde_json::from_value(v)
                .map_err(|e| tracing::warn!(key, "dropping undecodable cache entry: {e}"))
                .ok(),
            None => {
                self.entries.write().remove(key);
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, "value not cacheable: {e}");
                return;
            }
        };

        let now = Instant::now();
        let mut entries = self.entries.write();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
