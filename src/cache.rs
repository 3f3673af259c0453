//! # TTL Cache
//! Small read-through cache: `key -> (value, expiry)`.
//!
//! Entries expire after a fixed time-to-live; expired entries are dropped on
//! access. Invalidation is always safe, the only cost is a refetch.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<HashMap<K, (V, Instant)>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fresh value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut map = self.inner.lock();
        match map.get(key) {
            Some((v, expires)) if *expires > now => Some(v.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let expires = Instant::now() + self.ttl;
        self.inner.lock().insert(key, (value, expires));
    }

    pub fn invalidate(&self, key: &K) {
        self.inner.lock().remove(key);
    }

    /// Whether nothing is stored, expired entries included until next access.
    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Return the cached value or run `fetch` and cache its success.
    /// Errors are not cached. The lock is never held across the fetch.
    /// The boolean is `true` on a cache hit.
    pub async fn get_or_try_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key) {
            return Ok((v, true));
        }
        let v = fetch().await?;
        self.insert(key, v.clone());
        Ok((v, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let c: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(20));
        c.insert("markets", 7);
        assert_eq!(c.get(&"markets"), Some(7));

        tokio::time::advance(Duration::from_secs(19)).await;
        assert_eq!(c.get(&"markets"), Some(7));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(c.get(&"markets"), None);
        assert!(c.is_empty(), "expired entry is dropped on access");
    }

    #[tokio::test(start_paused = true)]
    async fn read_through_fetches_once_per_ttl() {
        let c: TtlCache<String, Vec<u8>> = TtlCache::new(Duration::from_secs(15));
        let mut calls = 0;

        let (v, hit) = c
            .get_or_try_fetch("k".to_string(), || {
                calls += 1;
                async { Ok::<_, ()>(vec![1, 2]) }
            })
            .await
            .unwrap();
        assert_eq!((v, hit), (vec![1, 2], false));

        let (_, hit) = c
            .get_or_try_fetch("k".to_string(), || {
                calls += 1;
                async { Ok::<_, ()>(vec![9]) }
            })
            .await
            .unwrap();
        assert!(hit);
        assert_eq!(calls, 1);

        tokio::time::advance(Duration::from_secs(16)).await;
        let (v, hit) = c
            .get_or_try_fetch("k".to_string(), || {
                calls += 1;
                async { Ok::<_, ()>(vec![3]) }
            })
            .await
            .unwrap();
        assert_eq!((v, hit), (vec![3], false));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let c: TtlCache<u8, u8> = TtlCache::new(Duration::from_secs(30));
        let r = c.get_or_try_fetch(1, || async { Err::<u8, _>("boom") }).await;
        assert_eq!(r, Err("boom"));
        assert!(c.is_empty());
    }

    #[test]
    fn invalidate_drops_one_key() {
        let c: TtlCache<u8, u8> = TtlCache::new(Duration::from_secs(30));
        c.insert(1, 1);
        c.insert(2, 2);
        c.invalidate(&1);
        assert_eq!(c.get(&1), None);
        assert_eq!(c.get(&2), Some(2));
        c.invalidate(&2);
        assert!(c.is_empty());
    }
}
