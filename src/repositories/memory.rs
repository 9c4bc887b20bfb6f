//! In-process storage backend.
//!
//! Every collection is an `Arc<RwLock<..>>`; mutations that must be atomic
//! (budget compare-and-swap, conditional debit, stock decrement) are done
//! under a single write guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    BudgetRepository, LedgerRepository, PointsRepository, PromotionRepository, ReceiptRepository,
    RewardRepository, SavedPromotionRepository, UserRepository, UserRewardRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Budget, NewUser, PointSource, PointTransaction, Promotion, Receipt, Reward, SavedPromotion,
    User, UserPoints, UserReward,
};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Default, Clone)]
pub struct MemoryUserRepository {
    rows: Arc<RwLock<Vec<User>>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_firebase_id(&self, uid: &str) -> AppResult<Option<User>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|u| u.firebase_id.as_deref() == Some(uid))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let mut rows = self.rows.write().await;
        let duplicate = rows.iter().any(|u| {
            u.email == user.email
                || (user.firebase_id.is_some() && u.firebase_id == user.firebase_id)
        });
        if duplicate {
            return Err(AppError::Conflict("User already exists".into()));
        }
        let created = User {
            id: rows.len() as i64 + 1,
            email: user.email,
            name: user.name,
            firebase_id: user.firebase_id,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        *slot = user.clone();
        Ok(user.clone())
    }
}

#[derive(Default, Clone)]
pub struct MemoryReceiptRepository {
    rows: Arc<RwLock<HashMap<String, Receipt>>>,
}

#[async_trait]
impl ReceiptRepository for MemoryReceiptRepository {
    async fn insert(&self, receipt: &Receipt) -> AppResult<Receipt> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&receipt.id) {
            return Err(AppError::Conflict("Receipt already exists".into()));
        }
        rows.insert(receipt.id.clone(), receipt.clone());
        Ok(receipt.clone())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Receipt>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Receipt>> {
        let rows = self.rows.read().await;
        let mut list: Vec<Receipt> = rows
            .values()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.scan_date.cmp(&b.scan_date));
        Ok(list)
    }

    async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .count() as u64)
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.rows.write().await.remove(id).is_some())
    }
}

#[derive(Default, Clone)]
pub struct MemoryBudgetRepository {
    rows: Arc<RwLock<HashMap<String, Budget>>>,
}

#[async_trait]
impl BudgetRepository for MemoryBudgetRepository {
    async fn find(&self, user_id: &str, month_year: &str) -> AppResult<Option<Budget>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|b| b.user_id == user_id && b.month_year == month_year)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Budget>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Budget>> {
        let rows = self.rows.read().await;
        let mut list: Vec<Budget> = rows
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.month_year.cmp(&b.month_year));
        Ok(list)
    }

    async fn insert(&self, budget: &Budget) -> AppResult<Budget> {
        let mut rows = self.rows.write().await;
        let duplicate = rows.contains_key(&budget.id)
            || rows
                .values()
                .any(|b| b.user_id == budget.user_id && b.month_year == budget.month_year);
        if duplicate {
            return Err(AppError::Conflict("Budget already exists".into()));
        }
        let mut stored = budget.clone();
        stored.version = 0;
        rows.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn compare_and_swap(&self, budget: &Budget) -> AppResult<Option<Budget>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&budget.id) {
            Some(current) if current.version == budget.version => {
                let mut next = budget.clone();
                next.version += 1;
                *current = next.clone();
                Ok(Some(next))
            }
            Some(_) => Ok(None),
            None => Err(AppError::NotFound("Budget not found".into())),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.rows.write().await.remove(id).is_some())
    }
}

#[derive(Default, Clone)]
pub struct MemoryPointsRepository {
    rows: Arc<RwLock<HashMap<String, UserPoints>>>,
    /// 与 `MemoryLedgerRepository` 共享；加锁顺序固定为先账户后流水
    ledger: Arc<RwLock<Vec<PointTransaction>>>,
}

impl MemoryPointsRepository {
    pub fn with_ledger(ledger: &MemoryLedgerRepository) -> Self {
        Self {
            rows: Arc::default(),
            ledger: ledger.rows.clone(),
        }
    }
}

fn apply_credit(rows: &mut HashMap<String, UserPoints>, user_id: &str, points: i64) -> UserPoints {
    let account = rows
        .entry(user_id.to_string())
        .or_insert_with(|| UserPoints::empty(user_id));
    account.total_points += points;
    account.available_points += points;
    account.last_updated = Utc::now();
    account.clone()
}

fn duplicate_entry(ledger: &[PointTransaction], tx: &PointTransaction) -> AppResult<()> {
    if ledger.iter().any(|t| t.id == tx.id) {
        return Err(AppError::Conflict("Point transaction already exists".into()));
    }
    Ok(())
}

#[async_trait]
impl PointsRepository for MemoryPointsRepository {
    async fn find(&self, user_id: &str) -> AppResult<Option<UserPoints>> {
        Ok(self.rows.read().await.get(user_id).cloned())
    }

    async fn ensure(&self, user_id: &str) -> AppResult<UserPoints> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .entry(user_id.to_string())
            .or_insert_with(|| UserPoints::empty(user_id))
            .clone())
    }

    async fn credit(&self, user_id: &str, points: i64) -> AppResult<UserPoints> {
        let mut rows = self.rows.write().await;
        Ok(apply_credit(&mut rows, user_id, points))
    }

    async fn credit_with_entry(&self, tx: &PointTransaction) -> AppResult<UserPoints> {
        let mut rows = self.rows.write().await;
        let mut ledger = self.ledger.write().await;
        duplicate_entry(&ledger, tx)?;
        ledger.push(tx.clone());
        Ok(apply_credit(&mut rows, &tx.user_id, tx.points))
    }

    async fn debit_with_entry(&self, tx: &PointTransaction) -> AppResult<Option<UserPoints>> {
        let mut rows = self.rows.write().await;
        let mut ledger = self.ledger.write().await;
        duplicate_entry(&ledger, tx)?;
        match rows.get_mut(&tx.user_id) {
            Some(account) if account.available_points >= tx.points => {
                account.available_points -= tx.points;
                account.spent_points += tx.points;
                account.last_updated = Utc::now();
                ledger.push(tx.clone());
                Ok(Some(account.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Default, Clone)]
pub struct MemoryLedgerRepository {
    rows: Arc<RwLock<Vec<PointTransaction>>>,
}

#[async_trait]
impl LedgerRepository for MemoryLedgerRepository {
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<PointTransaction>> {
        let rows = self.rows.read().await;
        // 追加顺序即时间顺序，倒序输出
        Ok(rows
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<PointTransaction>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id && t.transaction_date > since)
            .cloned()
            .collect())
    }

    async fn exists_by_source(&self, user_id: &str, source: PointSource) -> AppResult<bool> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .any(|t| t.user_id == user_id && t.source == source))
    }
}

#[derive(Default, Clone)]
pub struct MemoryRewardRepository {
    rows: Arc<RwLock<HashMap<String, Reward>>>,
}

#[async_trait]
impl RewardRepository for MemoryRewardRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Reward>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Reward>> {
        let rows = self.rows.read().await;
        let mut list: Vec<Reward> = rows.values().cloned().collect();
        list.sort_by(|a, b| a.points_cost.cmp(&b.points_cost).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn list_available(&self) -> AppResult<Vec<Reward>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(Reward::is_redeemable)
            .collect())
    }

    async fn insert(&self, reward: &Reward) -> AppResult<Reward> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&reward.id) {
            return Err(AppError::Conflict("Reward already exists".into()));
        }
        rows.insert(reward.id.clone(), reward.clone());
        Ok(reward.clone())
    }

    async fn update(&self, reward: &Reward) -> AppResult<Reward> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .get_mut(&reward.id)
            .ok_or_else(|| AppError::NotFound("Reward not found".into()))?;
        *slot = reward.clone();
        Ok(reward.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.rows.write().await.remove(id).is_some())
    }

    async fn take_one(&self, id: &str) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(id) {
            Some(reward) if reward.is_redeemable() => {
                reward.quantity -= 1;
                if reward.quantity <= 0 {
                    reward.is_available = false;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_one(&self, id: &str) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(reward) = rows.get_mut(id) {
            // 只恢复因库存归零而自动下架的奖励
            if reward.quantity <= 0 {
                reward.is_available = true;
            }
            reward.quantity += 1;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryUserRewardRepository {
    rows: Arc<RwLock<Vec<UserReward>>>,
}

#[async_trait]
impl UserRewardRepository for MemoryUserRewardRepository {
    async fn insert(&self, reward: &UserReward) -> AppResult<UserReward> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| r.id == reward.id) {
            return Err(AppError::Conflict("Redemption already exists".into()));
        }
        rows.push(reward.clone());
        Ok(reward.clone())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<UserReward>> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<UserReward>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update(&self, reward: &UserReward) -> AppResult<UserReward> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .iter_mut()
            .find(|r| r.id == reward.id)
            .ok_or_else(|| AppError::NotFound("Redemption record not found".into()))?;
        *slot = reward.clone();
        Ok(reward.clone())
    }
}

#[derive(Default, Clone)]
pub struct MemoryPromotionRepository {
    rows: Arc<RwLock<Vec<Promotion>>>,
}

impl MemoryPromotionRepository {
    async fn filtered<F>(&self, pred: F) -> Vec<Promotion>
    where
        F: Fn(&Promotion) -> bool,
    {
        let rows = self.rows.read().await;
        rows.iter().filter(|p| pred(p)).cloned().collect()
    }
}

#[async_trait]
impl PromotionRepository for MemoryPromotionRepository {
    async fn list_all(&self) -> AppResult<Vec<Promotion>> {
        Ok(self.rows.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Promotion>> {
        Ok(self.rows.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Promotion>> {
        Ok(self.filtered(|p| ids.contains(&p.id)).await)
    }

    async fn find_by_promotion_id(&self, promotion_id: i32) -> AppResult<Option<Promotion>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|p| p.promotion_id == Some(promotion_id))
            .cloned())
    }

    async fn list_by_category(&self, category: &str) -> AppResult<Vec<Promotion>> {
        Ok(self
            .filtered(|p| p.category.eq_ignore_ascii_case(category))
            .await)
    }

    async fn search_merchant(&self, merchant: &str) -> AppResult<Vec<Promotion>> {
        Ok(self.filtered(|p| contains_ci(&p.merchant, merchant)).await)
    }

    async fn search_text(&self, text: &str) -> AppResult<Vec<Promotion>> {
        Ok(self
            .filtered(|p| contains_ci(&p.merchant, text) || contains_ci(&p.description, text))
            .await)
    }

    async fn list_expiring_after(&self, date: &str) -> AppResult<Vec<Promotion>> {
        Ok(self.filtered(|p| p.expiry.as_str() > date).await)
    }

    async fn insert(&self, promotion: &Promotion) -> AppResult<Promotion> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|p| p.id == promotion.id) {
            return Err(AppError::Conflict("Promotion already exists".into()));
        }
        let mut stored = promotion.clone();
        stored.saved_at = None;
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, promotion: &Promotion) -> AppResult<Promotion> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .iter_mut()
            .find(|p| p.id == promotion.id)
            .ok_or_else(|| AppError::NotFound("Promotion not found".into()))?;
        *slot = promotion.clone();
        slot.saved_at = None;
        Ok(slot.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|p| p.id != id);
        Ok(rows.len() != before)
    }
}

#[derive(Default, Clone)]
pub struct MemorySavedPromotionRepository {
    rows: Arc<RwLock<Vec<SavedPromotion>>>,
}

#[async_trait]
impl SavedPromotionRepository for MemorySavedPromotionRepository {
    async fn find(&self, user_id: &str, promotion_id: &str) -> AppResult<Option<SavedPromotion>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|s| s.user_id == user_id && s.promotion_id == promotion_id)
            .cloned())
    }

    async fn insert(&self, saved: &SavedPromotion) -> AppResult<SavedPromotion> {
        let mut rows = self.rows.write().await;
        if rows
            .iter()
            .any(|s| s.user_id == saved.user_id && s.promotion_id == saved.promotion_id)
        {
            return Err(AppError::Conflict("Promotion already saved".into()));
        }
        rows.push(saved.clone());
        Ok(saved.clone())
    }

    async fn delete(&self, user_id: &str, promotion_id: &str) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|s| !(s.user_id == user_id && s.promotion_id == promotion_id));
        Ok(rows.len() != before)
    }

    async fn count_by_promotion(&self, promotion_id: &str) -> AppResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|s| s.promotion_id == promotion_id).count() as u64)
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<SavedPromotion>> {
        let rows = self.rows.read().await;
        let mut list: Vec<SavedPromotion> = rows
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;

    #[tokio::test]
    async fn test_budget_compare_and_swap_rejects_stale_version() {
        let repo = MemoryBudgetRepository::default();
        let stored = repo
            .insert(&Budget::with_defaults("u1", "2024-03"))
            .await
            .unwrap();

        let mut first = stored.clone();
        first.total_budget = 2000.0;
        let swapped = repo.compare_and_swap(&first).await.unwrap().unwrap();
        assert_eq!(swapped.version, 1);

        // 仍持有旧版本号的写入失败
        let mut stale = stored.clone();
        stale.total_budget = 10.0;
        assert!(repo.compare_and_swap(&stale).await.unwrap().is_none());
        let current = repo.find("u1", "2024-03").await.unwrap().unwrap();
        assert_eq!(current.total_budget, 2000.0);
    }

    #[tokio::test]
    async fn test_budget_insert_duplicate_month_conflicts() {
        let repo = MemoryBudgetRepository::default();
        repo.insert(&Budget::with_defaults("u1", "2024-03"))
            .await
            .unwrap();
        let err = repo
            .insert(&Budget::with_defaults("u1", "2024-03"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    fn entry(user_id: &str, points: i64, kind: TransactionType) -> PointTransaction {
        PointTransaction::new(
            user_id,
            points,
            kind,
            PointSource::ReceiptScan,
            "r",
            String::new(),
        )
    }

    #[tokio::test]
    async fn test_points_debit_is_conditional() {
        let ledger = MemoryLedgerRepository::default();
        let repo = MemoryPointsRepository::with_ledger(&ledger);
        repo.credit("u1", 100).await.unwrap();
        let too_much = entry("u1", 150, TransactionType::Spent);
        assert!(repo.debit_with_entry(&too_much).await.unwrap().is_none());
        assert!(ledger.list_by_user("u1").await.unwrap().is_empty());

        let after = repo
            .debit_with_entry(&entry("u1", 60, TransactionType::Spent))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.available_points, 40);
        assert_eq!(after.spent_points, 60);
        assert_eq!(after.total_points, 100);
        assert_eq!(ledger.list_by_user("u1").await.unwrap().len(), 1);

        let nobody = entry("nobody", 1, TransactionType::Spent);
        assert!(repo.debit_with_entry(&nobody).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_entry_credits_nothing() {
        let ledger = MemoryLedgerRepository::default();
        let repo = MemoryPointsRepository::with_ledger(&ledger);
        let mut tx = entry("u1", 20, TransactionType::Earned);
        tx.id = "receipt-scan:rc1".into();

        let account = repo.credit_with_entry(&tx).await.unwrap();
        assert_eq!(account.available_points, 20);
        assert!(matches!(
            repo.credit_with_entry(&tx).await,
            Err(AppError::Conflict(_))
        ));

        let account = repo.find("u1").await.unwrap().unwrap();
        assert_eq!(account.available_points, 20);
        assert_eq!(account.total_points, 20);
        assert_eq!(ledger.list_by_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_take_one_clears_availability_at_zero() {
        let repo = MemoryRewardRepository::default();
        let reward = Reward {
            id: "r1".into(),
            name: "Voucher".into(),
            description: String::new(),
            points_cost: 100,
            image_url: None,
            category: "VOUCHER".into(),
            is_available: true,
            quantity: 1,
            merchant_name: None,
            terms_conditions: None,
            expiry_date: None,
        };
        repo.insert(&reward).await.unwrap();
        assert!(repo.take_one("r1").await.unwrap());
        let after = repo.find_by_id("r1").await.unwrap().unwrap();
        assert_eq!(after.quantity, 0);
        assert!(!after.is_available);
        assert!(!repo.take_one("r1").await.unwrap());

        repo.restore_one("r1").await.unwrap();
        let restored = repo.find_by_id("r1").await.unwrap().unwrap();
        assert_eq!(restored.quantity, 1);
        assert!(restored.is_available);
    }

    #[tokio::test]
    async fn test_restore_keeps_admin_disabled_reward_hidden() {
        let repo = MemoryRewardRepository::default();
        let mut reward = Reward {
            id: "r1".into(),
            name: "Headphones".into(),
            description: String::new(),
            points_cost: 800,
            image_url: None,
            category: "ELECTRONICS".into(),
            is_available: true,
            quantity: 3,
            merchant_name: None,
            terms_conditions: None,
            expiry_date: None,
        };
        repo.insert(&reward).await.unwrap();
        assert!(repo.take_one("r1").await.unwrap());

        // 兑换进行中管理员下架
        reward.quantity = 2;
        reward.is_available = false;
        repo.update(&reward).await.unwrap();

        repo.restore_one("r1").await.unwrap();
        let after = repo.find_by_id("r1").await.unwrap().unwrap();
        assert_eq!(after.quantity, 3);
        assert!(!after.is_available);
    }

    #[tokio::test]
    async fn test_ledger_lists_newest_first() {
        let repo = MemoryLedgerRepository::default();
        let points_repo = MemoryPointsRepository::with_ledger(&repo);
        for points in [10, 20, 30] {
            points_repo
                .credit_with_entry(&entry("u1", points, TransactionType::Earned))
                .await
                .unwrap();
        }
        let list = repo.list_by_user("u1").await.unwrap();
        assert_eq!(
            list.iter().map(|t| t.points).collect::<Vec<_>>(),
            vec![30, 20, 10]
        );
        assert!(
            repo.exists_by_source("u1", PointSource::ReceiptScan)
                .await
                .unwrap()
        );
        assert!(
            !repo
                .exists_by_source("u1", PointSource::WelcomeBonus)
                .await
                .unwrap()
        );
    }
}
