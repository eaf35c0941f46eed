//! Two-Tier TTL Cache
//!
//! Read paths across the app share one cache shape: an in-process map
//! consulted first, and an optional durable tier consulted on miss,
//! but only for entries written with `persist`. Expiry is checked
//! lazily on read - there is no background sweep - and an expired
//! entry is evicted from whichever tier detected it.
//!
//! Entries are opaque JSON values. The cache performs no type
//! checking; callers are responsible for key-to-type consistency.
//! The durable tier's discipline is last-writer-wins, no merge.
//!
//! # Modules
//!
//! - [`store`]: The [`DurableStore`] trait and a JSON-file tier

pub mod store;

pub use store::{CacheError, DurableStore, JsonFileStore};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Namespace prefix applied to every durable-tier key.
pub const DURABLE_PREFIX: &str = "shelfward.cache.";

/// One cached value with its expiry instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Memory-first cache with an optional durable tier.
pub struct TtlCache {
    memory: HashMap<String, CacheEntry>,
    durable: Option<Box<dyn DurableStore>>,
}

impl TtlCache {
    /// Memory-only cache; `persist` writes are silently downgraded.
    pub fn in_memory() -> Self {
        Self {
            memory: HashMap::new(),
            durable: None,
        }
    }

    /// Cache backed by the given durable tier.
    pub fn with_durable(durable: Box<dyn DurableStore>) -> Self {
        Self {
            memory: HashMap::new(),
            durable: Some(durable),
        }
    }

    /// Look a value up, expiring lazily.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    /// Store a value with the given time-to-live. With `persist`, the
    /// entry is also written to the durable tier (if one exists) and
    /// survives process restarts until it expires.
    pub fn set(&mut self, key: &str, value: Value, ttl: Duration, persist: bool) {
        self.set_at(key, value, ttl, persist, Utc::now());
    }

    /// Drop one key from both tiers.
    pub fn clear(&mut self, key: &str) {
        self.memory.remove(key);
        if let Some(durable) = &mut self.durable {
            if let Err(err) = durable.remove(&durable_key(key)) {
                warn!(key, %err, "durable cache remove failed");
            }
        }
    }

    /// Drop every key starting with `prefix` from both tiers.
    pub fn clear_by_prefix(&mut self, prefix: &str) {
        self.memory.retain(|k, _| !k.starts_with(prefix));
        if let Some(durable) = &mut self.durable {
            if let Err(err) = durable.remove_prefix(&durable_key(prefix)) {
                warn!(prefix, %err, "durable cache prefix remove failed");
            }
        }
    }

    /// Drop everything from both tiers.
    pub fn clear_all(&mut self) {
        self.memory.clear();
        if let Some(durable) = &mut self.durable {
            if let Err(err) = durable.remove_prefix(DURABLE_PREFIX) {
                warn!(%err, "durable cache clear failed");
            }
        }
    }

    fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        if let Some(entry) = self.memory.get(key) {
            if entry.is_expired_at(now) {
                debug!(key, "evicting expired entry from memory tier");
                self.memory.remove(key);
                // The durable copy, if any, is the same entry; drop it
                // too rather than resurrecting it on the next miss.
                if let Some(durable) = &mut self.durable {
                    let _ = durable.remove(&durable_key(key));
                }
                return None;
            }
            return Some(entry.value.clone());
        }

        let durable = self.durable.as_mut()?;
        let stored = match durable.read(&durable_key(key)) {
            Ok(stored) => stored?,
            Err(err) => {
                warn!(key, %err, "durable cache read failed");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&stored) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, %err, "corrupt durable cache entry dropped");
                let _ = durable.remove(&durable_key(key));
                return None;
            }
        };
        if entry.is_expired_at(now) {
            debug!(key, "evicting expired entry from durable tier");
            let _ = durable.remove(&durable_key(key));
            return None;
        }
        let value = entry.value.clone();
        // Promote so the next read stays in-process.
        self.memory.insert(key.to_string(), entry);
        Some(value)
    }

    fn set_at(&mut self, key: &str, value: Value, ttl: Duration, persist: bool, now: DateTime<Utc>) {
        let entry = CacheEntry {
            value,
            expires_at: now + ttl,
        };
        if persist {
            if let Some(durable) = &mut self.durable {
                match serde_json::to_string(&entry) {
                    Ok(payload) => {
                        if let Err(err) = durable.write(&durable_key(key), &payload) {
                            warn!(key, %err, "durable cache write failed");
                        }
                    }
                    Err(err) => warn!(key, %err, "cache entry not serializable"),
                }
            }
        }
        self.memory.insert(key.to_string(), entry);
    }
}

fn durable_key(key: &str) -> String {
    format!("{DURABLE_PREFIX}{key}")
}
