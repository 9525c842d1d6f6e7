use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};

use super::store::{CacheStore, StoreError};

/// Process-local cache backend for single-node deployments and tests.
///
/// Expiry is evaluated lazily on access.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
    unavailable: AtomicBool,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".into()));
        }
        Ok(())
    }

    fn live_value(entry: Option<&(String, Option<Instant>)>, now: Instant) -> Option<String> {
        match entry {
            Some((value, Some(deadline))) if *deadline > now => Some(value.clone()),
            Some((value, None)) => Some(value.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        let entries = self.entries.lock().await;
        Ok(Self::live_value(entries.get(key), Instant::now()))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        self.check_available()?;
        let entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(keys
            .iter()
            .map(|key| Self::live_value(entries.get(key), now))
            .collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_available()?;
        let deadline = Instant::now().checked_add(ttl);
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), (value.to_owned(), deadline));
        Ok(())
    }

    async fn set_forever(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), (value.to_owned(), None));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if Self::live_value(entries.get(key), now).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_owned(), (value.to_owned(), now.checked_add(ttl)));
        Ok(true)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        if Self::live_value(entries.get(key), Instant::now()).as_deref() == Some(expected) {
            entries.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn set_if_absent_admits_exactly_one_writer() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .set_if_absent("pdf:hash:study:abc", &format!("doc-{i}"), Duration::from_secs(60))
                    .await
                    .expect("store available")
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("task joins") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = InMemoryCacheStore::new();
        store
            .set("query:doc:1", "value", Duration::from_secs(5))
            .await
            .expect("set");
        assert!(store.exists("query:doc:1").await.expect("exists"));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.get("query:doc:1").await.expect("get"), None);
        assert!(store
            .set_if_absent("query:doc:1", "fresh", Duration::from_secs(5))
            .await
            .expect("set_if_absent"));
    }

    #[tokio::test]
    async fn get_many_is_positionally_aligned() {
        let store = InMemoryCacheStore::new();
        store.set_forever("a", "1").await.expect("set");
        store.set_forever("c", "3").await.expect("set");

        let values = store
            .get_many(&["a".into(), "b".into(), "c".into()])
            .await
            .expect("get_many");
        assert_eq!(values, vec![Some("1".into()), None, Some("3".into())]);
    }

    #[tokio::test]
    async fn delete_if_equals_only_removes_matching_value() {
        let store = InMemoryCacheStore::new();
        store.set_forever("k", "owner-a").await.expect("set");

        assert!(!store.delete_if_equals("k", "owner-b").await.expect("cmp"));
        assert!(store.exists("k").await.expect("exists"));
        assert!(store.delete_if_equals("k", "owner-a").await.expect("cmp"));
        assert!(!store.exists("k").await.expect("exists"));
    }

    #[tokio::test]
    async fn outage_surfaces_as_unavailable() {
        let store = InMemoryCacheStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
