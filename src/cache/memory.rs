use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::CacheStore;
use crate::error::AppResult;

/// 每写入这么多次清扫一遍过期条目
const SWEEP_EVERY: usize = 256;

/// 进程内缓存。过期条目读取时按未命中处理，并在写入时定期清扫
#[derive(Default, Clone)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, (String, Instant)>>>,
    writes: Arc<AtomicUsize>,
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            entries.retain(|_, (_, expires_at)| *expires_at > now);
        }
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let store = MemoryCacheStore::default();
        store
            .set("k", "\"v\"".into(), Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.entries.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_are_swept_on_write() {
        let store = MemoryCacheStore::default();
        for i in 0..SWEEP_EVERY - 1 {
            store
                .set(&format!("promotions:merchant:m{i}"), "[]".into(), Duration::ZERO)
                .await
                .unwrap();
        }
        assert_eq!(store.entries.read().await.len(), SWEEP_EVERY - 1);

        store
            .set("promotions:all", "[]".into(), Duration::from_secs(60))
            .await
            .unwrap();
        let entries = store.entries.read().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("promotions:all"));
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let store = MemoryCacheStore::default();
        let ttl = Duration::from_secs(60);
        store.set("promotions:all", "[]".into(), ttl).await.unwrap();
        store.set("promotions:id:1", "{}".into(), ttl).await.unwrap();
        store.set("budgets:u1:all", "[]".into(), ttl).await.unwrap();
        store.delete_prefix("promotions:").await.unwrap();
        assert_eq!(store.get("promotions:all").await.unwrap(), None);
        assert_eq!(store.get("budgets:u1:all").await.unwrap(), Some("[]".into()));
    }
}
