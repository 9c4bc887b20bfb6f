use chrono::{Duration, Months, Utc};
use std::sync::Arc;

use crate::config::RewardsConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    PointSource, PointTransaction, RedemptionStatus, Reward, RewardRequest, TransactionType,
    UserPoints, UserReward, WELCOME_BONUS_CODE, WELCOME_BONUS_REWARD_ID,
    WELCOME_BONUS_REWARD_NAME, WelcomeBonusResponse,
};
use crate::repositories::{
    LedgerRepository, PointsRepository, ReceiptRepository, RewardRepository,
    UserRewardRepository,
};
use crate::utils::{generate_id, generate_redemption_code};

/// 库存不高于该值视为低库存
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Clone)]
pub struct RewardsService {
    receipts: Arc<dyn ReceiptRepository>,
    points: Arc<dyn PointsRepository>,
    ledger: Arc<dyn LedgerRepository>,
    rewards: Arc<dyn RewardRepository>,
    user_rewards: Arc<dyn UserRewardRepository>,
    config: RewardsConfig,
}

impl RewardsService {
    pub fn new(
        receipts: Arc<dyn ReceiptRepository>,
        points: Arc<dyn PointsRepository>,
        ledger: Arc<dyn LedgerRepository>,
        rewards: Arc<dyn RewardRepository>,
        user_rewards: Arc<dyn UserRewardRepository>,
        config: RewardsConfig,
    ) -> Self {
        Self {
            receipts,
            points,
            ledger,
            rewards,
            user_rewards,
            config,
        }
    }

    /// floor(total * 每元积分) + 基础积分，不为负
    pub fn points_for_expense(&self, total_expense: f64) -> i64 {
        if !total_expense.is_finite() || total_expense <= 0.0 {
            return self.config.base_points_per_receipt.max(0);
        }
        let earned = (total_expense * self.config.points_per_dollar).floor() as i64;
        (self.config.base_points_per_receipt + earned).max(0)
    }

    // ---------- 奖励目录 ----------

    pub async fn available_rewards(&self) -> AppResult<Vec<Reward>> {
        self.rewards.list_available().await
    }

    pub async fn rewards_by_category(&self, category: &str) -> AppResult<Vec<Reward>> {
        let list = self.rewards.list_available().await?;
        Ok(list
            .into_iter()
            .filter(|r| r.category.eq_ignore_ascii_case(category))
            .collect())
    }

    /// 当前可用积分买得起的奖励；无积分账户时为空
    pub async fn affordable_rewards(&self, user_id: &str) -> AppResult<Vec<Reward>> {
        let Some(account) = self.points.find(user_id).await? else {
            return Ok(Vec::new());
        };
        let list = self.rewards.list_available().await?;
        Ok(list
            .into_iter()
            .filter(|r| r.points_cost <= account.available_points)
            .collect())
    }

    pub async fn reward_by_id(&self, reward_id: &str) -> AppResult<Reward> {
        self.rewards
            .find_by_id(reward_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reward {reward_id} not found")))
    }

    // ---------- 积分账户与流水 ----------

    /// 不存在时创建空账户
    pub async fn user_points(&self, user_id: &str) -> AppResult<UserPoints> {
        self.points.ensure(user_id).await
    }

    /// 只读查询，不创建账户
    pub async fn find_user_points(&self, user_id: &str) -> AppResult<UserPoints> {
        self.points
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No points record for user {user_id}")))
    }

    /// days > 0 时只返回最近 days 天的流水
    pub async fn transactions(
        &self,
        user_id: &str,
        days: Option<i64>,
    ) -> AppResult<Vec<PointTransaction>> {
        match days {
            Some(days) if days > 0 => {
                let since = Utc::now() - Duration::days(days);
                self.ledger.list_by_user_since(user_id, since).await
            }
            _ => self.ledger.list_by_user(user_id).await,
        }
    }

    pub async fn transactions_by_type(
        &self,
        user_id: &str,
        transaction_type: TransactionType,
    ) -> AppResult<Vec<PointTransaction>> {
        let list = self.ledger.list_by_user(user_id).await?;
        Ok(list
            .into_iter()
            .filter(|t| t.transaction_type == transaction_type)
            .collect())
    }

    pub async fn transactions_by_source(
        &self,
        user_id: &str,
        source: PointSource,
    ) -> AppResult<Vec<PointTransaction>> {
        let list = self.ledger.list_by_user(user_id).await?;
        Ok(list.into_iter().filter(|t| t.source == source).collect())
    }

    /// 为小票发放积分。流水 id 由小票 id 决定，同一小票只会发放一次
    pub async fn award_points_for_receipt(&self, receipt_id: &str) -> AppResult<PointTransaction> {
        let receipt = self
            .receipts
            .find_by_id(receipt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Receipt {receipt_id} not found")))?;
        let user_id = receipt
            .user_id
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                AppError::ValidationError(format!("Receipt {receipt_id} has no owner"))
            })?;

        let points = self.points_for_expense(receipt.total_expense);
        let mut tx = PointTransaction::new(
            user_id,
            points,
            TransactionType::Earned,
            PointSource::ReceiptScan,
            receipt_id,
            format!(
                "Points earned from scanning receipt at {}",
                receipt.merchant_name
            ),
        );
        tx.id = format!("receipt-scan:{receipt_id}");

        // 流水与入账同一原子操作，流水 id 固定保证只发放一次
        self.points.credit_with_entry(&tx).await.map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Points already awarded for receipt {receipt_id}"))
            }
            other => other,
        })?;

        log::info!("Awarded {points} points to user {user_id} for receipt {receipt_id}");
        Ok(tx)
    }

    // ---------- 兑换 ----------

    /// 兑换奖励。
    ///
    /// 预检查之后的步骤在独立任务中执行：请求被取消时任务仍会完成或走完补偿，
    /// 不会出现扣了积分却没有兑换记录的情况。
    pub async fn redeem_reward(&self, user_id: &str, reward_id: &str) -> AppResult<UserReward> {
        let reward = self.reward_by_id(reward_id).await?;
        if !reward.is_redeemable() {
            return Err(AppError::Conflict("This reward is no longer available".into()));
        }

        let account = self.points.ensure(user_id).await?;
        if account.available_points < reward.points_cost {
            return Err(AppError::InsufficientPoints {
                available: account.available_points,
                required: reward.points_cost,
            });
        }

        let service = self.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move { service.settle_redemption(&user_id, reward).await })
            .await
            .map_err(|e| AppError::InternalError(format!("Redemption task failed: {e}")))?
    }

    async fn settle_redemption(&self, user_id: &str, reward: Reward) -> AppResult<UserReward> {
        let reward_id = reward.id.as_str();

        // 1. 条件扣分并记录支出流水
        let spent = PointTransaction::new(
            user_id,
            reward.points_cost,
            TransactionType::Spent,
            PointSource::RewardRedemption,
            reward_id,
            format!("Points spent on redeeming {}", reward.name),
        );
        if self.points.debit_with_entry(&spent).await?.is_none() {
            let available = self
                .points
                .find(user_id)
                .await?
                .map(|p| p.available_points)
                .unwrap_or(0);
            return Err(AppError::InsufficientPoints {
                available,
                required: reward.points_cost,
            });
        }

        // 2. 扣减库存
        let taken = match self.rewards.take_one(reward_id).await {
            Ok(taken) => taken,
            Err(e) => {
                self.rollback_points(user_id, &reward).await;
                return Err(e);
            }
        };
        if !taken {
            self.rollback_points(user_id, &reward).await;
            return Err(AppError::Conflict("This reward is no longer available".into()));
        }

        // 3. 兑换记录
        let now = Utc::now();
        let mut redemption = UserReward {
            id: generate_id(),
            user_id: user_id.to_string(),
            reward_id: reward.id.clone(),
            reward_name: reward.name.clone(),
            points_spent: reward.points_cost,
            redeemed_date: now,
            status: RedemptionStatus::Pending,
            redemption_code: None,
            delivery_info: None,
            expiry_date: None,
        };
        if reward.is_voucher() {
            redemption.redemption_code = Some(generate_redemption_code());
            redemption.status = RedemptionStatus::Fulfilled;
            redemption.expiry_date = reward.expiry_date.or_else(|| {
                now.checked_add_months(Months::new(self.config.voucher_validity_months))
            });
        }

        match self.user_rewards.insert(&redemption).await {
            Ok(saved) => {
                log::info!(
                    "User {user_id} redeemed reward {reward_id} for {} points (redemption {})",
                    reward.points_cost,
                    saved.id
                );
                Ok(saved)
            }
            Err(e) => {
                log::error!("Failed to store redemption of {reward_id} for user {user_id}: {e}");
                self.rollback_points(user_id, &reward).await;
                if let Err(restore_err) = self.rewards.restore_one(reward_id).await {
                    log::error!("Failed to restore stock for reward {reward_id}: {restore_err}");
                }
                Err(e)
            }
        }
    }

    /// 返还积分并记一笔 ROLLBACK_REDEMPTION 收入
    async fn rollback_points(&self, user_id: &str, reward: &Reward) {
        let refund = PointTransaction::new(
            user_id,
            reward.points_cost,
            TransactionType::Earned,
            PointSource::RollbackRedemption,
            &reward.id,
            format!("Points refunded for failed redemption of {}", reward.name),
        );
        if let Err(e) = self.points.credit_with_entry(&refund).await {
            log::error!(
                "Failed to refund {} points to user {user_id} for reward {}: {e}",
                reward.points_cost,
                reward.id
            );
        }
    }

    /// 新用户奖励，每个用户只能领取一次
    pub async fn redeem_welcome_bonus(&self, user_id: &str) -> AppResult<WelcomeBonusResponse> {
        if user_id.trim().is_empty() {
            return Err(AppError::ValidationError("userId is required".into()));
        }
        if self
            .ledger
            .exists_by_source(user_id, PointSource::WelcomeBonus)
            .await?
        {
            return Err(already_claimed());
        }

        let bonus = self.config.welcome_bonus_points;
        let mut tx = PointTransaction::new(
            user_id,
            bonus,
            TransactionType::Earned,
            PointSource::WelcomeBonus,
            user_id,
            "Welcome bonus for joining PaperWorth!".to_string(),
        );
        // 固定 id，并发领取时由唯一约束拦截
        tx.id = format!("welcome-bonus:{user_id}");
        self.points.credit_with_entry(&tx).await.map_err(|e| match e {
            AppError::Conflict(_) => already_claimed(),
            other => other,
        })?;

        let record = UserReward {
            id: generate_id(),
            user_id: user_id.to_string(),
            reward_id: WELCOME_BONUS_REWARD_ID.to_string(),
            reward_name: WELCOME_BONUS_REWARD_NAME.to_string(),
            points_spent: 0,
            redeemed_date: Utc::now(),
            status: RedemptionStatus::Fulfilled,
            redemption_code: Some(WELCOME_BONUS_CODE.to_string()),
            delivery_info: None,
            expiry_date: None,
        };
        if let Err(e) = self.user_rewards.insert(&record).await {
            log::warn!("Welcome bonus credited but reward record failed for user {user_id}: {e}");
        }

        log::info!("Welcome bonus of {bonus} points credited to user {user_id}");
        Ok(WelcomeBonusResponse {
            points_awarded: bonus,
            message: format!("Welcome bonus of {bonus} points has been added to your account!"),
        })
    }

    // ---------- 管理端 ----------

    pub async fn add_reward(&self, req: RewardRequest) -> AppResult<Reward> {
        validate_reward(&req)?;
        let reward = req.into_reward(generate_id());
        self.rewards.insert(&reward).await
    }

    pub async fn update_reward(&self, reward_id: &str, req: RewardRequest) -> AppResult<Reward> {
        validate_reward(&req)?;
        self.reward_by_id(reward_id).await?;
        self.rewards.update(&req.into_reward(reward_id.to_string())).await
    }

    pub async fn delete_reward(&self, reward_id: &str) -> AppResult<()> {
        if !self.rewards.delete(reward_id).await? {
            return Err(AppError::NotFound(format!("Reward {reward_id} not found")));
        }
        Ok(())
    }

    pub async fn low_stock_rewards(&self) -> AppResult<Vec<Reward>> {
        let list = self.rewards.list_all().await?;
        Ok(list
            .into_iter()
            .filter(|r| r.is_available && r.quantity <= LOW_STOCK_THRESHOLD)
            .collect())
    }

    pub async fn update_redemption_status(
        &self,
        redemption_id: &str,
        status: RedemptionStatus,
    ) -> AppResult<UserReward> {
        let mut record = self.redemption_by_id(redemption_id).await?;
        record.status = status;
        self.user_rewards.update(&record).await
    }

    pub async fn add_delivery_info(
        &self,
        redemption_id: &str,
        delivery_info: String,
    ) -> AppResult<UserReward> {
        let mut record = self.redemption_by_id(redemption_id).await?;
        record.delivery_info = Some(delivery_info);
        self.user_rewards.update(&record).await
    }

    async fn redemption_by_id(&self, redemption_id: &str) -> AppResult<UserReward> {
        self.user_rewards
            .find_by_id(redemption_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Redemption record {redemption_id} not found"))
            })
    }

    // ---------- 兑换历史 ----------

    pub async fn redemption_history(&self, user_id: &str) -> AppResult<Vec<UserReward>> {
        self.user_rewards.list_by_user(user_id).await
    }

    pub async fn redemptions_by_status(
        &self,
        user_id: &str,
        status: RedemptionStatus,
    ) -> AppResult<Vec<UserReward>> {
        let list = self.user_rewards.list_by_user(user_id).await?;
        Ok(list.into_iter().filter(|r| r.status == status).collect())
    }

    pub async fn recent_redemptions(&self, user_id: &str, days: i64) -> AppResult<Vec<UserReward>> {
        let since = Utc::now() - Duration::days(days.max(0));
        let list = self.user_rewards.list_by_user(user_id).await?;
        Ok(list
            .into_iter()
            .filter(|r| r.redeemed_date > since)
            .collect())
    }

    /// 未来 days 天内到期的已发放奖励
    pub async fn expiring_redemptions(
        &self,
        user_id: &str,
        days: i64,
    ) -> AppResult<Vec<UserReward>> {
        let now = Utc::now();
        let until = now + Duration::days(days.max(0));
        let list = self.user_rewards.list_by_user(user_id).await?;
        Ok(list
            .into_iter()
            .filter(|r| r.status == RedemptionStatus::Fulfilled)
            .filter(|r| matches!(r.expiry_date, Some(exp) if exp > now && exp <= until))
            .collect())
    }
}

fn already_claimed() -> AppError {
    AppError::Conflict("Welcome bonus has already been claimed".into())
}

fn validate_reward(req: &RewardRequest) -> AppResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::ValidationError("Reward name is required".into()));
    }
    if req.points_cost <= 0 {
        return Err(AppError::ValidationError(
            "pointsCost must be a positive integer".into(),
        ));
    }
    if req.quantity < 0 {
        return Err(AppError::ValidationError("quantity must not be negative".into()));
    }
    if req.category.trim().is_empty() {
        return Err(AppError::ValidationError("Reward category is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Receipt, VOUCHER_CATEGORY};
    use crate::repositories::Repositories;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn service_with(repos: &Repositories) -> RewardsService {
        RewardsService::new(
            repos.receipts.clone(),
            repos.points.clone(),
            repos.ledger.clone(),
            repos.rewards.clone(),
            repos.user_rewards.clone(),
            RewardsConfig::default(),
        )
    }

    fn reward(id: &str, category: &str, cost: i64, quantity: i32) -> Reward {
        Reward {
            id: id.into(),
            name: format!("Reward {id}"),
            description: String::new(),
            points_cost: cost,
            image_url: None,
            category: category.into(),
            is_available: quantity > 0,
            quantity,
            merchant_name: None,
            terms_conditions: None,
            expiry_date: None,
        }
    }

    async fn seed_points(repos: &Repositories, user: &str, points: i64) {
        repos.points.credit(user, points).await.unwrap();
    }

    #[test]
    fn test_points_formula() {
        let svc = service_with(&Repositories::in_memory());
        assert_eq!(svc.points_for_expense(20.0), 20);
        assert_eq!(svc.points_for_expense(12.99), 12);
        assert_eq!(svc.points_for_expense(0.0), 0);
        assert_eq!(svc.points_for_expense(-5.0), 0);
    }

    #[tokio::test]
    async fn test_voucher_redemption_happy_path() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        repos
            .rewards
            .insert(&reward("r1", VOUCHER_CATEGORY, 300, 2))
            .await
            .unwrap();
        seed_points(&repos, "u1", 500).await;

        let redemption = svc.redeem_reward("u1", "r1").await.unwrap();
        assert_eq!(redemption.status, RedemptionStatus::Fulfilled);
        let code = redemption.redemption_code.clone().unwrap();
        assert!(regex::Regex::new(r"^PW-[0-9A-F]{8}$").unwrap().is_match(&code));
        assert!(redemption.expiry_date.unwrap() > Utc::now() + Duration::days(150));

        let points = svc.user_points("u1").await.unwrap();
        assert_eq!(points.available_points, 200);
        assert_eq!(points.spent_points, 300);
        assert_eq!(svc.reward_by_id("r1").await.unwrap().quantity, 1);

        let spent = svc
            .transactions_by_type("u1", TransactionType::Spent)
            .await
            .unwrap();
        assert_eq!(spent.len(), 1);
        assert_eq!(spent[0].source, PointSource::RewardRedemption);
        assert_eq!(spent[0].reference_id, "r1");
    }

    #[tokio::test]
    async fn test_non_voucher_stays_pending_and_last_unit_disables_reward() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        repos
            .rewards
            .insert(&reward("r2", "ELECTRONICS", 100, 1))
            .await
            .unwrap();
        seed_points(&repos, "u1", 100).await;

        let redemption = svc.redeem_reward("u1", "r2").await.unwrap();
        assert_eq!(redemption.status, RedemptionStatus::Pending);
        assert!(redemption.redemption_code.is_none());

        let r = svc.reward_by_id("r2").await.unwrap();
        assert_eq!(r.quantity, 0);
        assert!(!r.is_available);
        assert!(svc.available_rewards().await.unwrap().is_empty());

        seed_points(&repos, "u2", 500).await;
        assert!(matches!(
            svc.redeem_reward("u2", "r2").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_insufficient_points_has_no_side_effects() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        repos
            .rewards
            .insert(&reward("r1", VOUCHER_CATEGORY, 200, 3))
            .await
            .unwrap();
        seed_points(&repos, "u1", 100).await;

        let err = svc.redeem_reward("u1", "r1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientPoints {
                available: 100,
                required: 200
            }
        ));
        assert_eq!(svc.user_points("u1").await.unwrap().available_points, 100);
        assert_eq!(svc.reward_by_id("r1").await.unwrap().quantity, 3);
        assert!(svc.redemption_history("u1").await.unwrap().is_empty());
        assert!(svc.transactions("u1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reward_is_not_found() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        assert!(matches!(
            svc.redeem_reward("u1", "nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    /// 库存扣减总是失败的奖励仓库，用于验证补偿
    struct SoldOutRewards {
        inner: Arc<dyn RewardRepository>,
    }

    #[async_trait]
    impl RewardRepository for SoldOutRewards {
        async fn find_by_id(&self, id: &str) -> AppResult<Option<Reward>> {
            self.inner.find_by_id(id).await
        }
        async fn list_all(&self) -> AppResult<Vec<Reward>> {
            self.inner.list_all().await
        }
        async fn list_available(&self) -> AppResult<Vec<Reward>> {
            self.inner.list_available().await
        }
        async fn insert(&self, reward: &Reward) -> AppResult<Reward> {
            self.inner.insert(reward).await
        }
        async fn update(&self, reward: &Reward) -> AppResult<Reward> {
            self.inner.update(reward).await
        }
        async fn delete(&self, id: &str) -> AppResult<bool> {
            self.inner.delete(id).await
        }
        async fn take_one(&self, _id: &str) -> AppResult<bool> {
            Ok(false)
        }
        async fn restore_one(&self, id: &str) -> AppResult<()> {
            self.inner.restore_one(id).await
        }
    }

    #[tokio::test]
    async fn test_stock_race_refunds_points() {
        let mut repos = Repositories::in_memory();
        repos
            .rewards
            .insert(&reward("r1", VOUCHER_CATEGORY, 300, 1))
            .await
            .unwrap();
        repos.rewards = Arc::new(SoldOutRewards {
            inner: repos.rewards.clone(),
        });
        let svc = service_with(&repos);
        seed_points(&repos, "u1", 500).await;

        assert!(matches!(
            svc.redeem_reward("u1", "r1").await,
            Err(AppError::Conflict(_))
        ));
        let points = svc.user_points("u1").await.unwrap();
        assert_eq!(points.available_points, 500);
        assert_eq!(points.available_points, points.total_points - points.spent_points);
        assert!(svc.redemption_history("u1").await.unwrap().is_empty());

        let rollback = svc
            .transactions_by_source("u1", PointSource::RollbackRedemption)
            .await
            .unwrap();
        assert_eq!(rollback.len(), 1);
        assert_eq!(rollback[0].transaction_type, TransactionType::Earned);
        assert_eq!(rollback[0].points, 300);
    }

    #[tokio::test]
    async fn test_welcome_bonus_only_once() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);

        let first = svc.redeem_welcome_bonus("u1").await.unwrap();
        assert_eq!(first.points_awarded, 100);
        assert_eq!(
            first.message,
            "Welcome bonus of 100 points has been added to your account!"
        );
        assert!(matches!(
            svc.redeem_welcome_bonus("u1").await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(svc.user_points("u1").await.unwrap().available_points, 100);

        let history = svc.redemption_history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].points_spent, 0);
        assert_eq!(history[0].redemption_code.as_deref(), Some(WELCOME_BONUS_CODE));
        assert_eq!(history[0].status, RedemptionStatus::Fulfilled);
    }

    #[tokio::test]
    async fn test_concurrent_welcome_bonus_credits_once() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        let (a, b) = tokio::join!(
            svc.redeem_welcome_bonus("u1"),
            svc.redeem_welcome_bonus("u1")
        );
        assert!(a.is_ok() != b.is_ok());
        assert_eq!(svc.user_points("u1").await.unwrap().total_points, 100);
    }

    #[tokio::test]
    async fn test_award_points_for_receipt_once() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        let now = Utc::now();
        repos
            .receipts
            .insert(&Receipt {
                id: "rc1".into(),
                user_id: Some("u1".into()),
                merchant_name: "Starbucks".into(),
                date_of_purchase: now,
                total_expense: 20.75,
                category: "Cafes".into(),
                image_url: None,
                items: None,
                scan_date: now,
            })
            .await
            .unwrap();

        let tx = svc.award_points_for_receipt("rc1").await.unwrap();
        assert_eq!(tx.points, 20);
        assert_eq!(tx.source, PointSource::ReceiptScan);
        assert_eq!(tx.reference_id, "rc1");
        assert_eq!(tx.description, "Points earned from scanning receipt at Starbucks");
        assert!(matches!(
            svc.award_points_for_receipt("rc1").await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(svc.user_points("u1").await.unwrap().available_points, 20);
        assert!(matches!(
            svc.award_points_for_receipt("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    /// 首次入账失败的积分仓库
    struct FlakyPoints {
        inner: Arc<dyn PointsRepository>,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl PointsRepository for FlakyPoints {
        async fn find(&self, user_id: &str) -> AppResult<Option<UserPoints>> {
            self.inner.find(user_id).await
        }
        async fn ensure(&self, user_id: &str) -> AppResult<UserPoints> {
            self.inner.ensure(user_id).await
        }
        async fn credit(&self, user_id: &str, points: i64) -> AppResult<UserPoints> {
            self.inner.credit(user_id, points).await
        }
        async fn credit_with_entry(&self, tx: &PointTransaction) -> AppResult<UserPoints> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AppError::InternalError("connection reset".into()));
            }
            self.inner.credit_with_entry(tx).await
        }
        async fn debit_with_entry(&self, tx: &PointTransaction) -> AppResult<Option<UserPoints>> {
            self.inner.debit_with_entry(tx).await
        }
    }

    #[tokio::test]
    async fn test_failed_award_can_be_retried() {
        let mut repos = Repositories::in_memory();
        repos.points = Arc::new(FlakyPoints {
            inner: repos.points.clone(),
            fail_next: AtomicBool::new(true),
        });
        let svc = service_with(&repos);
        let now = Utc::now();
        repos
            .receipts
            .insert(&Receipt {
                id: "rc1".into(),
                user_id: Some("u1".into()),
                merchant_name: "Starbucks".into(),
                date_of_purchase: now,
                total_expense: 20.75,
                category: "Cafes".into(),
                image_url: None,
                items: None,
                scan_date: now,
            })
            .await
            .unwrap();

        assert!(svc.award_points_for_receipt("rc1").await.is_err());
        assert!(svc.transactions("u1", None).await.unwrap().is_empty());

        let tx = svc.award_points_for_receipt("rc1").await.unwrap();
        assert_eq!(tx.points, 20);
        let ledger_sum: i64 = svc
            .transactions("u1", None)
            .await
            .unwrap()
            .iter()
            .map(|t| t.points)
            .sum();
        assert_eq!(ledger_sum, 20);
        assert_eq!(svc.user_points("u1").await.unwrap().available_points, 20);
    }

    /// 写入兑换记录较慢的仓库
    struct SlowUserRewards {
        inner: Arc<dyn UserRewardRepository>,
    }

    #[async_trait]
    impl UserRewardRepository for SlowUserRewards {
        async fn insert(&self, reward: &UserReward) -> AppResult<UserReward> {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            self.inner.insert(reward).await
        }
        async fn find_by_id(&self, id: &str) -> AppResult<Option<UserReward>> {
            self.inner.find_by_id(id).await
        }
        async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<UserReward>> {
            self.inner.list_by_user(user_id).await
        }
        async fn update(&self, reward: &UserReward) -> AppResult<UserReward> {
            self.inner.update(reward).await
        }
    }

    #[tokio::test]
    async fn test_cancelled_redemption_still_records_reward() {
        let mut repos = Repositories::in_memory();
        repos
            .rewards
            .insert(&reward("r1", VOUCHER_CATEGORY, 300, 2))
            .await
            .unwrap();
        repos.user_rewards = Arc::new(SlowUserRewards {
            inner: repos.user_rewards.clone(),
        });
        let svc = service_with(&repos);
        seed_points(&repos, "u1", 500).await;

        // 请求在写兑换记录前被丢弃
        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            svc.redeem_reward("u1", "r1"),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        let history = svc.redemption_history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reward_id, "r1");
        assert_eq!(history[0].points_spent, 300);

        let points = svc.user_points("u1").await.unwrap();
        assert_eq!(points.available_points, 200);
        assert_eq!(points.spent_points, 300);
        assert_eq!(svc.reward_by_id("r1").await.unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_affordable_and_low_stock() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        for r in [
            reward("cheap", VOUCHER_CATEGORY, 50, 10),
            reward("mid", "ELECTRONICS", 150, 3),
            reward("dear", "ELECTRONICS", 5000, 20),
        ] {
            repos.rewards.insert(&r).await.unwrap();
        }
        assert!(svc.affordable_rewards("u1").await.unwrap().is_empty());

        seed_points(&repos, "u1", 150).await;
        let mut ids: Vec<String> = svc
            .affordable_rewards("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["cheap", "mid"]);

        let low: Vec<String> = svc
            .low_stock_rewards()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(low, vec!["mid"]);

        let electronics = svc.rewards_by_category("electronics").await.unwrap();
        assert_eq!(electronics.len(), 2);
    }

    #[tokio::test]
    async fn test_admin_redemption_updates() {
        let repos = Repositories::in_memory();
        let svc = service_with(&repos);
        repos
            .rewards
            .insert(&reward("r1", "MERCH", 10, 5))
            .await
            .unwrap();
        seed_points(&repos, "u1", 10).await;
        let redemption = svc.redeem_reward("u1", "r1").await.unwrap();

        let updated = svc
            .update_redemption_status(&redemption.id, RedemptionStatus::Fulfilled)
            .await
            .unwrap();
        assert_eq!(updated.status, RedemptionStatus::Fulfilled);
        let updated = svc
            .add_delivery_info(&redemption.id, "Blk 123 #04-56".into())
            .await
            .unwrap();
        assert_eq!(updated.delivery_info.as_deref(), Some("Blk 123 #04-56"));
        assert!(matches!(
            svc.update_redemption_status("nope", RedemptionStatus::Cancelled)
                .await,
            Err(AppError::NotFound(_))
        ));
    }
}
