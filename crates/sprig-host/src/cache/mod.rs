//! Remote manifest caching with TTL support

use std::time::{Duration, SystemTime};

use dashmap::DashMap;

use sprig_core::types::PackageConfig;

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached manifest
    pub config: PackageConfig,
    /// When the entry was stored
    pub stored_at: SystemTime,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl CacheEntry {
    /// Create new cache entry with default TTL (1 hour)
    pub fn new(config: PackageConfig) -> Self {
        Self::with_ttl(config, Duration::from_secs(3600))
    }

    /// Create cache entry with custom TTL
    pub fn with_ttl(config: PackageConfig, ttl: Duration) -> Self {
        Self {
            config,
            stored_at: SystemTime::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    pub fn is_fresh(&self) -> bool {
        match self.stored_at.elapsed() {
            Ok(elapsed) => elapsed < self.ttl,
            Err(_) => false, // Clock went backwards, consider stale
        }
    }
}

/// In-memory cache of remote manifests, keyed by repository reference
#[derive(Debug, Default)]
pub struct ManifestCache {
    cache: DashMap<String, CacheEntry>,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cached manifest if fresh
    pub fn get(&self, key: &str) -> Option<PackageConfig> {
        let fresh = {
            let entry = self.cache.get(key)?;
            if entry.is_fresh() {
                Some(entry.config.clone())
            } else {
                None
            }
        };

        if fresh.is_none() {
            // Remove stale entry
            self.cache.remove(key);
        }
        fresh
    }

    /// Store manifest with default TTL
    pub fn insert(&self, key: String, config: PackageConfig) {
        self.cache.insert(key, CacheEntry::new(config));
    }

    /// Store manifest with custom TTL
    pub fn insert_with_ttl(&self, key: String, config: PackageConfig, ttl: Duration) {
        self.cache.insert(key, CacheEntry::with_ttl(config, ttl));
    }

    pub fn stats(&self) -> CacheStats {
        let fresh_entries = self.cache.iter().filter(|e| e.is_fresh()).count();
        CacheStats {
            total_entries: self.cache.len(),
            fresh_entries,
            stale_entries: self.cache.len() - fresh_entries,
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Remove stale entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.is_fresh());
        before - self.cache.len()
    }
}
