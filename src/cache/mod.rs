//! Read-through cache for budgets and promotion queries.
//!
//! The cache is best effort: every failure (backend error, deadline, bad JSON)
//! is logged and treated as a miss, so callers always fall back to the store.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::AppResult;

/// 缓存后端端口，值为 JSON 字符串
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;
    async fn delete(&self, key: &str) -> AppResult<()>;
    /// 删除所有以 prefix 开头的键
    async fn delete_prefix(&self, prefix: &str) -> AppResult<()>;
}

/// 缓存键
pub mod keys {
    pub const PROMOTIONS_PREFIX: &str = "promotions:";

    pub fn budget(user_id: &str, month_year: &str) -> String {
        format!("budgets:{user_id}:{month_year}")
    }

    pub fn budgets_all(user_id: &str) -> String {
        format!("budgets:{user_id}:all")
    }

    pub fn budgets_prefix(user_id: &str) -> String {
        format!("budgets:{user_id}:")
    }

    pub fn promotions_all() -> String {
        "promotions:all".to_string()
    }

    pub fn promotions_by_category(category: &str) -> String {
        format!("promotions:category:{}", category.to_lowercase())
    }

    pub fn promotions_by_merchant(merchant: &str) -> String {
        format!("promotions:merchant:{}", merchant.to_lowercase())
    }

    pub fn promotion(id: &str) -> String {
        format!("promotions:id:{id}")
    }
}

#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    deadline: Duration,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, deadline: Duration) -> Self {
        Self {
            store,
            ttl,
            deadline,
        }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(
            Arc::new(memory::MemoryCacheStore::default()),
            ttl,
            Duration::from_secs(5),
        )
    }

    /// url 为空时使用进程内缓存，否则连接 Redis
    pub async fn connect(config: &CacheConfig, deadline: Duration) -> AppResult<Self> {
        let ttl = Duration::from_secs(config.ttl_secs);
        if config.url.trim().is_empty() {
            log::info!("Cache url not configured, using in-process cache");
            return Ok(Self::new(
                Arc::new(memory::MemoryCacheStore::default()),
                ttl,
                deadline,
            ));
        }
        let store = redis_store::RedisCacheStore::connect(config).await?;
        log::info!("Connected to redis cache");
        Ok(Self::new(Arc::new(store), ttl, deadline))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match tokio::time::timeout(self.deadline, self.store.get(key)).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(e)) => {
                log::warn!("Cache get failed for {key}: {e}");
                return None;
            }
            Err(_) => {
                log::warn!("Cache get timed out for {key}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Discarding undecodable cache entry {key}: {e}");
                None
            }
        }
    }

    /// null 值不写入缓存
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Cache serialize failed for {key}: {e}");
                return;
            }
        };
        if raw == "null" {
            return;
        }
        match tokio::time::timeout(self.deadline, self.store.set(key, raw, self.ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Cache set failed for {key}: {e}"),
            Err(_) => log::warn!("Cache set timed out for {key}"),
        }
    }

    pub async fn invalidate(&self, key: &str) {
        match tokio::time::timeout(self.deadline, self.store.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Cache delete failed for {key}: {e}"),
            Err(_) => log::warn!("Cache delete timed out for {key}"),
        }
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        match tokio::time::timeout(self.deadline, self.store.delete_prefix(prefix)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Cache prefix delete failed for {prefix}: {e}"),
            Err(_) => log::warn!("Cache prefix delete timed out for {prefix}"),
        }
    }
}
