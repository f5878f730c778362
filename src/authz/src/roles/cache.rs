//! Two-level caching for reachable-role results
//!
//! - [`ExecutionCache`]: request-scoped LRU, cleared at the request boundary
//! - [`DurableCache`]: shared cache surviving requests, explicit invalidation only
//!
//! Both are keyed by [`cache_key`], a BLAKE3 digest of the sorted role names
//! optionally prefixed by an organizational discriminator.

use super::types::Role;
use crate::config::ResolverConfig;
use crate::error::Result;
use dashmap::DashMap;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Default number of role sets kept in the execution cache
pub const DEFAULT_EXECUTION_CAPACITY: usize = 1_000;

/// Compute the cache key for a set of roles
///
/// Names are sorted so that the key does not depend on input order. Each name
/// is length-prefixed, so no name can impersonate a pair of names.
pub fn cache_key(roles: &[Role], prefix: Option<&str>) -> String {
    let mut names: Vec<&str> = roles.iter().map(Role::name).collect();
    names.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for name in names {
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
    }
    let digest = hasher.finalize();

    match prefix {
        Some(prefix) => format!("{}__{}", prefix, digest.to_hex()),
        None => digest.to_hex().to_string(),
    }
}

/// Request-scoped cache of resolved role sets
#[derive(Debug)]
pub struct ExecutionCache {
    entries: LruCache<String, Vec<Role>>,
}

impl ExecutionCache {
    /// Create a cache holding at most `capacity` role sets
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Vec<Role>> {
        self.entries.get(key).cloned()
    }

    pub fn put(&mut self, key: String, roles: Vec<Role>) {
        self.entries.put(key, roles);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Drop every entry (request boundary)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for ExecutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTION_CAPACITY)
    }
}

/// Cache shared across requests and processes
///
/// Payloads are opaque bytes; the resolver encodes role lists as JSON and
/// treats anything it cannot decode as a miss. Writes replace whole values.
pub trait DurableCache: Send + Sync {
    /// Fetch the payload stored under `key`
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `payload` under `key`, replacing any previous value
    fn set(&self, key: &str, payload: Vec<u8>) -> Result<()>;

    /// Remove a single entry
    fn invalidate(&self, key: &str) -> Result<()>;

    /// Remove every entry
    fn clear(&self) -> Result<()>;
}

/// Encode a role list for the durable cache
pub fn encode_roles(roles: &[Role]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(roles)?)
}

/// Decode a durable cache payload
pub fn decode_roles(payload: &[u8]) -> Result<Vec<Role>> {
    Ok(serde_json::from_slice(payload)?)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Vec<u8>,
    created_at: Instant,
}

impl CacheEntry {
    fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.map_or(false, |ttl| self.created_at.elapsed() > ttl)
    }
}

/// In-process [`DurableCache`] backed by `DashMap`
///
/// Thread-safe; entries optionally expire after a TTL.
#[derive(Debug, Default)]
pub struct InMemoryDurableCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Option<Duration>,
}

impl InMemoryDurableCache {
    /// Create a cache whose entries never expire
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    /// Create a cache using the configured `durable_cache_ttl_secs`
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.durable_cache_ttl(),
        }
    }

    /// Store a raw payload, bypassing encoding
    pub fn insert_raw(&self, key: impl Into<String>, payload: Vec<u8>) {
        self.entries.insert(key.into(), CacheEntry::new(payload));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DurableCache for InMemoryDurableCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(self.ttl) {
                return Ok(Some(entry.payload.clone()));
            }
            // Expired - remove from cache
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), CacheEntry::new(payload));
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

/// Resolver cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by the execution cache
    pub execution_hits: usize,
    /// Lookups answered by the durable cache
    pub durable_hits: usize,
    /// Lookups that required a full resolution
    pub misses: usize,
    /// Current execution cache size
    pub execution_entries: usize,
    /// Execution cache capacity
    pub execution_capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups answered by either cache
    pub fn hit_rate(&self) -> f64 {
        let hits = self.execution_hits + self.durable_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
