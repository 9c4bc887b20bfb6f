use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::map_update_err;
use crate::entities::{reward_entity as rewards, user_reward_entity as user_rewards};
use crate::error::{AppError, AppResult};
use crate::models::{Reward, UserReward};
use crate::repositories::{RewardRepository, UserRewardRepository};

#[derive(Clone)]
pub struct PgRewardRepository {
    pool: DatabaseConnection,
}

impl PgRewardRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    fn active_model(reward: &Reward) -> rewards::ActiveModel {
        rewards::ActiveModel {
            id: Set(reward.id.clone()),
            name: Set(reward.name.clone()),
            description: Set(reward.description.clone()),
            points_cost: Set(reward.points_cost),
            image_url: Set(reward.image_url.clone()),
            category: Set(reward.category.clone()),
            is_available: Set(reward.is_available),
            quantity: Set(reward.quantity),
            merchant_name: Set(reward.merchant_name.clone()),
            terms_conditions: Set(reward.terms_conditions.clone()),
            expiry_date: Set(reward.expiry_date),
        }
    }
}

#[async_trait]
impl RewardRepository for PgRewardRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Reward>> {
        Ok(rewards::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn list_all(&self) -> AppResult<Vec<Reward>> {
        let list = rewards::Entity::find()
            .order_by_asc(rewards::Column::PointsCost)
            .order_by_asc(rewards::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn list_available(&self) -> AppResult<Vec<Reward>> {
        let list = rewards::Entity::find()
            .filter(rewards::Column::IsAvailable.eq(true))
            .filter(rewards::Column::Quantity.gt(0))
            .order_by_asc(rewards::Column::PointsCost)
            .order_by_asc(rewards::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, reward: &Reward) -> AppResult<Reward> {
        let model = Self::active_model(reward)
            .insert(&self.pool)
            .await
            .map_err(|e| AppError::from_insert(e, "Reward"))?;
        Ok(model.into())
    }

    async fn update(&self, reward: &Reward) -> AppResult<Reward> {
        let model = Self::active_model(reward)
            .update(&self.pool)
            .await
            .map_err(|e| map_update_err(e, "Reward"))?;
        Ok(model.into())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let res = rewards::Entity::delete_by_id(id.to_string())
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn take_one(&self, id: &str) -> AppResult<bool> {
        // 原子扣减 (where is_available and quantity > 0)，扣到 0 同时下架
        let result = rewards::Entity::update_many()
            .col_expr(
                rewards::Column::Quantity,
                Expr::col(rewards::Column::Quantity).sub(1),
            )
            .col_expr(rewards::Column::IsAvailable, Expr::cust("quantity - 1 > 0"))
            .filter(rewards::Column::Id.eq(id))
            .filter(rewards::Column::IsAvailable.eq(true))
            .filter(rewards::Column::Quantity.gt(0))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn restore_one(&self, id: &str) -> AppResult<()> {
        rewards::Entity::update_many()
            .col_expr(
                rewards::Column::Quantity,
                Expr::col(rewards::Column::Quantity).add(1),
            )
            // 只恢复因库存归零而自动下架的奖励
            .col_expr(
                rewards::Column::IsAvailable,
                Expr::cust("CASE WHEN quantity <= 0 THEN TRUE ELSE is_available END"),
            )
            .filter(rewards::Column::Id.eq(id))
            .exec(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgUserRewardRepository {
    pool: DatabaseConnection,
}

impl PgUserRewardRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    fn active_model(reward: &UserReward) -> user_rewards::ActiveModel {
        user_rewards::ActiveModel {
            id: Set(reward.id.clone()),
            user_id: Set(reward.user_id.clone()),
            reward_id: Set(reward.reward_id.clone()),
            reward_name: Set(reward.reward_name.clone()),
            points_spent: Set(reward.points_spent),
            redeemed_date: Set(reward.redeemed_date),
            status: Set(reward.status),
            redemption_code: Set(reward.redemption_code.clone()),
            delivery_info: Set(reward.delivery_info.clone()),
            expiry_date: Set(reward.expiry_date),
        }
    }
}

#[async_trait]
impl UserRewardRepository for PgUserRewardRepository {
    async fn insert(&self, reward: &UserReward) -> AppResult<UserReward> {
        let model = Self::active_model(reward)
            .insert(&self.pool)
            .await
            .map_err(|e| AppError::from_insert(e, "Redemption"))?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<UserReward>> {
        Ok(user_rewards::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<UserReward>> {
        let list = user_rewards::Entity::find()
            .filter(user_rewards::Column::UserId.eq(user_id))
            .order_by_desc(user_rewards::Column::RedeemedDate)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn update(&self, reward: &UserReward) -> AppResult<UserReward> {
        let model = Self::active_model(reward)
            .update(&self.pool)
            .await
            .map_err(|e| map_update_err(e, "Redemption record"))?;
        Ok(model.into())
    }
}
