//! Keyed query cache shared by everything that lists or mutates entries.
//!
//! Keys are segment lists (`["entries", "<user>"]`); bulk operations match by
//! key prefix. Writers follow "last writer wins"; the lock is never held
//! across an `.await`.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

pub type QueryKey = Vec<String>;

/// Build a key from string-like segments.
pub fn query_key<I, T>(segments: I) -> QueryKey
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    segments.into_iter().map(Into::into).collect()
}

#[derive(Clone, Debug)]
struct CachedQuery<V> {
    data: V,
    stale: bool,
    fetched_at: Instant,
}

/// Pre-mutation copy of every query under a prefix.
#[derive(Clone, Debug)]
pub struct CacheSnapshot<V> {
    prefix: QueryKey,
    queries: Vec<(QueryKey, CachedQuery<V>)>,
}

impl<V> CacheSnapshot<V> {
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Cheap to clone: clones share the same storage.
#[derive(Debug)]
pub struct QueryCache<V> {
    inner: Arc<Mutex<HashMap<QueryKey, CachedQuery<V>>>>,
    stale_time: Option<Duration>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            stale_time: self.stale_time,
        }
    }
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn has_prefix(key: &[String], prefix: &[String]) -> bool {
    key.len() >= prefix.len() && key[..prefix.len()] == *prefix
}

impl<V> QueryCache<V> {
    /// Queries stay fresh until invalidated.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            stale_time: None,
        }
    }

    /// Queries also go stale `stale_time` after they were stored.
    pub fn with_stale_time(stale_time: Duration) -> Self {
        Self {
            stale_time: Some(stale_time),
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CachedQuery<V>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, key: QueryKey, data: V) {
        self.lock().insert(
            key,
            CachedQuery {
                data,
                stale: false,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn contains(&self, key: &[String]) -> bool {
        self.lock().contains_key(key)
    }

    pub fn is_fresh(&self, key: &[String]) -> bool {
        self.lock().get(key).is_some_and(|query| {
            !query.stale
                && self
                    .stale_time
                    .is_none_or(|limit| query.fetched_at.elapsed() < limit)
        })
    }

    /// Apply `update` to the data of every cached query under `prefix`.
    /// Absent queries are not created.
    pub fn update_matching<F>(&self, prefix: &[String], mut update: F) -> usize
    where
        F: FnMut(&mut V),
    {
        let mut queries = self.lock();
        let mut touched = 0;
        for (key, query) in queries.iter_mut() {
            if has_prefix(key, prefix) {
                update(&mut query.data);
                touched += 1;
            }
        }
        touched
    }

    /// Mark every query under `prefix` stale so the next read refetches.
    pub fn invalidate(&self, prefix: &[String]) -> usize {
        let touched = self.update_stale(prefix);
        tracing::debug!("invalidated {touched} cached queries under {prefix:?}");
        touched
    }

    fn update_stale(&self, prefix: &[String]) -> usize {
        let mut queries = self.lock();
        let mut touched = 0;
        for (key, query) in queries.iter_mut() {
            if has_prefix(key, prefix) {
                query.stale = true;
                touched += 1;
            }
        }
        touched
    }

    pub fn remove_matching(&self, prefix: &[String]) -> usize {
        let mut queries = self.lock();
        let before = queries.len();
        queries.retain(|key, _| !has_prefix(key, prefix));
        before - queries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<V: Clone> QueryCache<V> {
    pub fn get(&self, key: &[String]) -> Option<V> {
        self.lock().get(key).map(|query| query.data.clone())
    }

    pub fn snapshot(&self, prefix: &[String]) -> CacheSnapshot<V> {
        let queries = self
            .lock()
            .iter()
            .filter(|(key, _)| has_prefix(key, prefix))
            .map(|(key, query)| (key.clone(), query.clone()))
            .collect();
        CacheSnapshot {
            prefix: prefix.to_vec(),
            queries,
        }
    }

    /// Put back the data `snapshot` saw. Queries added under the prefix since
    /// then are dropped. A query invalidated in the meantime stays stale, so
    /// writes that settled after the snapshot still force a refetch.
    pub fn restore(&self, snapshot: CacheSnapshot<V>) {
        let mut queries = self.lock();
        let invalidated: HashSet<QueryKey> = queries
            .iter()
            .filter(|(key, query)| query.stale && has_prefix(key, &snapshot.prefix))
            .map(|(key, _)| key.clone())
            .collect();
        queries.retain(|key, _| !has_prefix(key, &snapshot.prefix));
        for (key, mut query) in snapshot.queries {
            query.stale |= invalidated.contains(&key);
            queries.insert(key, query);
        }
    }
}
