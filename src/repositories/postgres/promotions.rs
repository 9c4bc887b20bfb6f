use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use super::{like_contains, map_update_err};
use crate::entities::{promotion_entity as promotions, saved_promotion_entity as saved};
use crate::error::{AppError, AppResult};
use crate::models::{Promotion, SavedPromotion};
use crate::repositories::{PromotionRepository, SavedPromotionRepository};

#[derive(Clone)]
pub struct PgPromotionRepository {
    pool: DatabaseConnection,
}

impl PgPromotionRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    fn active_model(p: &Promotion) -> promotions::ActiveModel {
        promotions::ActiveModel {
            id: Set(p.id.clone()),
            merchant: Set(p.merchant.clone()),
            description: Set(p.description.clone()),
            expiry: Set(p.expiry.clone()),
            image_url: Set(p.image_url.clone()),
            location: Set(p.location.clone()),
            code: Set(p.code.clone()),
            conditions: Set(p.conditions.clone()),
            category: Set(p.category.clone()),
            promotion_id: Set(p.promotion_id),
        }
    }

    async fn fetch(&self, condition: Condition) -> AppResult<Vec<Promotion>> {
        let list = promotions::Entity::find()
            .filter(condition)
            .order_by_asc(promotions::Column::Expiry)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }
}

fn lower_like(col: promotions::Column, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(like_contains(needle))
}

#[async_trait]
impl PromotionRepository for PgPromotionRepository {
    async fn list_all(&self) -> AppResult<Vec<Promotion>> {
        self.fetch(Condition::all()).await
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Promotion>> {
        Ok(promotions::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Promotion>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(Condition::all().add(promotions::Column::Id.is_in(ids.iter().cloned())))
            .await
    }

    async fn find_by_promotion_id(&self, promotion_id: i32) -> AppResult<Option<Promotion>> {
        Ok(promotions::Entity::find()
            .filter(promotions::Column::PromotionId.eq(promotion_id))
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn list_by_category(&self, category: &str) -> AppResult<Vec<Promotion>> {
        self.fetch(
            Condition::all().add(
                Expr::expr(Func::lower(Expr::col(promotions::Column::Category)))
                    .eq(category.to_lowercase()),
            ),
        )
        .await
    }

    async fn search_merchant(&self, merchant: &str) -> AppResult<Vec<Promotion>> {
        self.fetch(Condition::all().add(lower_like(promotions::Column::Merchant, merchant)))
            .await
    }

    async fn search_text(&self, text: &str) -> AppResult<Vec<Promotion>> {
        self.fetch(
            Condition::any()
                .add(lower_like(promotions::Column::Merchant, text))
                .add(lower_like(promotions::Column::Description, text)),
        )
        .await
    }

    async fn list_expiring_after(&self, date: &str) -> AppResult<Vec<Promotion>> {
        self.fetch(Condition::all().add(promotions::Column::Expiry.gt(date)))
            .await
    }

    async fn insert(&self, promotion: &Promotion) -> AppResult<Promotion> {
        let model = Self::active_model(promotion)
            .insert(&self.pool)
            .await
            .map_err(|e| AppError::from_insert(e, "Promotion"))?;
        Ok(model.into())
    }

    async fn update(&self, promotion: &Promotion) -> AppResult<Promotion> {
        let model = Self::active_model(promotion)
            .update(&self.pool)
            .await
            .map_err(|e| map_update_err(e, "Promotion"))?;
        Ok(model.into())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let res = promotions::Entity::delete_by_id(id.to_string())
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }
}

#[derive(Clone)]
pub struct PgSavedPromotionRepository {
    pool: DatabaseConnection,
}

impl PgSavedPromotionRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedPromotionRepository for PgSavedPromotionRepository {
    async fn find(&self, user_id: &str, promotion_id: &str) -> AppResult<Option<SavedPromotion>> {
        Ok(saved::Entity::find()
            .filter(saved::Column::UserId.eq(user_id))
            .filter(saved::Column::PromotionId.eq(promotion_id))
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn insert(&self, entry: &SavedPromotion) -> AppResult<SavedPromotion> {
        let model = saved::ActiveModel {
            id: Set(entry.id.clone()),
            user_id: Set(entry.user_id.clone()),
            promotion_id: Set(entry.promotion_id.clone()),
            saved_at: Set(entry.saved_at),
        }
        .insert(&self.pool)
        .await
        .map_err(|e| AppError::from_insert(e, "Saved promotion"))?;
        Ok(model.into())
    }

    async fn delete(&self, user_id: &str, promotion_id: &str) -> AppResult<bool> {
        let res = saved::Entity::delete_many()
            .filter(saved::Column::UserId.eq(user_id))
            .filter(saved::Column::PromotionId.eq(promotion_id))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn count_by_promotion(&self, promotion_id: &str) -> AppResult<u64> {
        Ok(saved::Entity::find()
            .filter(saved::Column::PromotionId.eq(promotion_id))
            .count(&self.pool)
            .await?)
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<SavedPromotion>> {
        let list = saved::Entity::find()
            .filter(saved::Column::UserId.eq(user_id))
            .order_by_desc(saved::Column::SavedAt)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }
}
