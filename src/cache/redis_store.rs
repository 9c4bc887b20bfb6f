use async_trait::async_trait;
use redis::IntoConnectionInfo;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::CacheStore;
use crate::config::CacheConfig;
use crate::error::AppResult;

const SCAN_BATCH: usize = 200;

/// Redis 缓存后端
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(config: &CacheConfig) -> AppResult<Self> {
        let mut info = config.url.as_str().into_connection_info()?;
        if let Some(username) = config.username.as_ref().filter(|u| !u.is_empty()) {
            info.redis.username = Some(username.clone());
        }
        if let Some(password) = config.password.as_ref().filter(|p| !p.is_empty()) {
            info.redis.password = Some(password.clone());
        }
        let client = redis::Client::open(info)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let secs = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<_, ()>(&mut conn)
                    .await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(())
    }
}

/// 转义 SCAN MATCH 的通配字符，前缀按字面匹配
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '*' | '?' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("budgets:u1:"), "budgets:u1:");
        assert_eq!(escape_glob("budgets:*:"), "budgets:\\*:");
        assert_eq!(escape_glob("a?b[c]d\\"), "a\\?b\\[c\\]d\\\\");
    }
}
