//! Storage ports.
//!
//! Services only talk to these traits. `postgres` holds the sea-orm backed
//! implementations used in production, `memory` the in-process ones used for
//! `memory://` deployments and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{
    Budget, NewUser, PointSource, PointTransaction, Promotion, Receipt, Reward, SavedPromotion,
    User, UserPoints, UserReward,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_firebase_id(&self, uid: &str) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// 邮箱或 firebase_id 重复时返回 Conflict
    async fn insert(&self, user: NewUser) -> AppResult<User>;
    async fn update(&self, user: &User) -> AppResult<User>;
}

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    async fn insert(&self, receipt: &Receipt) -> AppResult<Receipt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Receipt>>;
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Receipt>>;
    async fn count_by_user(&self, user_id: &str) -> AppResult<u64>;
    /// 返回是否确实删除了记录
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn find(&self, user_id: &str, month_year: &str) -> AppResult<Option<Budget>>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Budget>>;
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Budget>>;
    /// (user_id, month_year) 已存在时返回 Conflict
    async fn insert(&self, budget: &Budget) -> AppResult<Budget>;
    /// 比较交换：仅当存储中的 version 等于 `budget.version` 时写入并 version + 1。
    /// 版本不匹配返回 `Ok(None)`。
    async fn compare_and_swap(&self, budget: &Budget) -> AppResult<Option<Budget>>;
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait PointsRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> AppResult<Option<UserPoints>>;
    /// 不存在时创建空账户，并发创建时返回已存在的记录
    async fn ensure(&self, user_id: &str) -> AppResult<UserPoints>;
    /// total += points, available += points，不记流水
    async fn credit(&self, user_id: &str, points: i64) -> AppResult<UserPoints>;
    /// 原子地追加一条收入流水并入账 `tx.points`。
    /// 流水 id 重复时返回 Conflict，余额不变。
    async fn credit_with_entry(&self, tx: &PointTransaction) -> AppResult<UserPoints>;
    /// 原子地条件扣减 `tx.points`（available >= points）并追加支出流水。
    /// 余额不足返回 `Ok(None)`，不做任何修改。
    async fn debit_with_entry(&self, tx: &PointTransaction) -> AppResult<Option<UserPoints>>;
}

/// 流水只读端口，写入随积分变动经 `PointsRepository` 完成
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// 按时间倒序
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<PointTransaction>>;
    async fn list_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<PointTransaction>>;
    async fn exists_by_source(&self, user_id: &str, source: PointSource) -> AppResult<bool>;
}

#[async_trait]
pub trait RewardRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Reward>>;
    async fn list_all(&self) -> AppResult<Vec<Reward>>;
    /// is_available 且 quantity > 0
    async fn list_available(&self) -> AppResult<Vec<Reward>>;
    async fn insert(&self, reward: &Reward) -> AppResult<Reward>;
    async fn update(&self, reward: &Reward) -> AppResult<Reward>;
    async fn delete(&self, id: &str) -> AppResult<bool>;
    /// 原子扣减一件库存（要求 is_available 且 quantity > 0），扣到 0 时置为不可用。
    /// 返回是否扣减成功。
    async fn take_one(&self, id: &str) -> AppResult<bool>;
    /// 归还一件库存并恢复可用
    async fn restore_one(&self, id: &str) -> AppResult<()>;
}

#[async_trait]
pub trait UserRewardRepository: Send + Sync {
    async fn insert(&self, reward: &UserReward) -> AppResult<UserReward>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<UserReward>>;
    /// 按兑换时间倒序
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<UserReward>>;
    async fn update(&self, reward: &UserReward) -> AppResult<UserReward>;
}

#[async_trait]
pub trait PromotionRepository: Send + Sync {
    async fn list_all(&self) -> AppResult<Vec<Promotion>>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Promotion>>;
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Promotion>>;
    async fn find_by_promotion_id(&self, promotion_id: i32) -> AppResult<Option<Promotion>>;
    /// 分类大小写不敏感的精确匹配
    async fn list_by_category(&self, category: &str) -> AppResult<Vec<Promotion>>;
    /// 商家名大小写不敏感子串匹配
    async fn search_merchant(&self, merchant: &str) -> AppResult<Vec<Promotion>>;
    /// 商家名或描述大小写不敏感子串匹配
    async fn search_text(&self, text: &str) -> AppResult<Vec<Promotion>>;
    /// expiry > date（ISO 字符串比较）
    async fn list_expiring_after(&self, date: &str) -> AppResult<Vec<Promotion>>;
    async fn insert(&self, promotion: &Promotion) -> AppResult<Promotion>;
    async fn update(&self, promotion: &Promotion) -> AppResult<Promotion>;
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait SavedPromotionRepository: Send + Sync {
    async fn find(&self, user_id: &str, promotion_id: &str) -> AppResult<Option<SavedPromotion>>;
    /// (user_id, promotion_id) 已存在时返回 Conflict
    async fn insert(&self, saved: &SavedPromotion) -> AppResult<SavedPromotion>;
    async fn delete(&self, user_id: &str, promotion_id: &str) -> AppResult<bool>;
    async fn count_by_promotion(&self, promotion_id: &str) -> AppResult<u64>;
    /// 按收藏时间倒序
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<SavedPromotion>>;
}

/// 全部存储端口的集合，由启动代码按配置选择实现
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub receipts: Arc<dyn ReceiptRepository>,
    pub budgets: Arc<dyn BudgetRepository>,
    pub points: Arc<dyn PointsRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub rewards: Arc<dyn RewardRepository>,
    pub user_rewards: Arc<dyn UserRewardRepository>,
    pub promotions: Arc<dyn PromotionRepository>,
    pub saved_promotions: Arc<dyn SavedPromotionRepository>,
}

impl Repositories {
    pub fn postgres(pool: sea_orm::DatabaseConnection) -> Self {
        Self {
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            receipts: Arc::new(postgres::PgReceiptRepository::new(pool.clone())),
            budgets: Arc::new(postgres::PgBudgetRepository::new(pool.clone())),
            points: Arc::new(postgres::PgPointsRepository::new(pool.clone())),
            ledger: Arc::new(postgres::PgLedgerRepository::new(pool.clone())),
            rewards: Arc::new(postgres::PgRewardRepository::new(pool.clone())),
            user_rewards: Arc::new(postgres::PgUserRewardRepository::new(pool.clone())),
            promotions: Arc::new(postgres::PgPromotionRepository::new(pool.clone())),
            saved_promotions: Arc::new(postgres::PgSavedPromotionRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let ledger = memory::MemoryLedgerRepository::default();
        Self {
            users: Arc::new(memory::MemoryUserRepository::default()),
            receipts: Arc::new(memory::MemoryReceiptRepository::default()),
            budgets: Arc::new(memory::MemoryBudgetRepository::default()),
            points: Arc::new(memory::MemoryPointsRepository::with_ledger(&ledger)),
            ledger: Arc::new(ledger),
            rewards: Arc::new(memory::MemoryRewardRepository::default()),
            user_rewards: Arc::new(memory::MemoryUserRewardRepository::default()),
            promotions: Arc::new(memory::MemoryPromotionRepository::default()),
            saved_promotions: Arc::new(memory::MemorySavedPromotionRepository::default()),
        }
    }
}
