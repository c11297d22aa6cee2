//! In-process caches: the per-user profile cache and a TTL store with a pluggable clock.

use crate::domain::profile::UserProfile;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock cannot leave these maps half-updated.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Key/value store whose entries expire `ttl` after insertion. Expired entries are
/// evicted lazily on read or by [`TtlCache::purge_expired`].
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (V, DateTime<Utc>)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            Some((value, inserted_at)) if now - *inserted_at < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        lock(&self.entries).insert(key, (value, now));
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, (_, inserted_at)| now - *inserted_at < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last-built profile per user.
pub trait ProfileCache: Send + Sync {
    fn get(&self, user_id: &str) -> Option<UserProfile>;

    fn put(&self, profile: UserProfile);
}

/// Unbounded map; a newer profile for the same user replaces the older one.
#[derive(Debug, Default)]
pub struct InMemoryProfileCache {
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl InMemoryProfileCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileCache for InMemoryProfileCache {
    fn get(&self, user_id: &str) -> Option<UserProfile> {
        lock(&self.profiles).get(user_id).cloned()
    }

    fn put(&self, profile: UserProfile) {
        lock(&self.profiles).insert(profile.user_id.clone(), profile);
    }
}
