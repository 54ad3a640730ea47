use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::EnhancementResult;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *offset += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.origin + *offset
    }
}

struct CacheEntry<T> {
    stored_at: Instant,
    value: T,
}

/// LRU cache whose entries also expire after `ttl`.
pub struct TtlCache<T: Clone> {
    ttl: Duration,
    entries: Mutex<LruCache<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str, now: Instant) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = entries.get(key) {
            if now.saturating_duration_since(entry.stored_at) < self.ttl {
                return Some(entry.value.clone());
            }
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: String, value: T, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.stored_at) >= self.ttl)
            .map(|(stale, _)| stale.clone())
            .collect();
        for stale in expired {
            entries.pop(&stale);
        }
        entries.put(
            key,
            CacheEntry {
                stored_at: now,
                value,
            },
        );
    }

    /// Applies `update` to a cached entry in place.
    pub fn update(&self, key: &str, update: impl FnOnce(&mut T)) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = entries.get_mut(key) {
            update(&mut entry.value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recently completed enhancements keyed by identity and request fingerprint.
pub type RequestCache = TtlCache<EnhancementResult>;
