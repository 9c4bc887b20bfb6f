use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Promotion, SavedPromotion};
use crate::repositories::{PromotionRepository, SavedPromotionRepository};
use crate::utils::generate_id;

#[derive(Clone)]
pub struct SavedPromotionService {
    saved: Arc<dyn SavedPromotionRepository>,
    promotions: Arc<dyn PromotionRepository>,
}

impl SavedPromotionService {
    pub fn new(
        saved: Arc<dyn SavedPromotionRepository>,
        promotions: Arc<dyn PromotionRepository>,
    ) -> Self {
        Self { saved, promotions }
    }

    /// 收藏优惠；已收藏时返回原记录
    pub async fn save(&self, user_id: &str, promotion_id: &str) -> AppResult<SavedPromotion> {
        validate_ids(user_id, promotion_id)?;
        if self.promotions.find_by_id(promotion_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Promotion {promotion_id} not found"
            )));
        }
        if let Some(existing) = self.saved.find(user_id, promotion_id).await? {
            return Ok(existing);
        }

        let record = SavedPromotion {
            id: generate_id(),
            user_id: user_id.to_string(),
            promotion_id: promotion_id.to_string(),
            saved_at: Utc::now(),
        };
        match self.saved.insert(&record).await {
            Ok(saved) => Ok(saved),
            // 并发收藏，读取已存在的记录
            Err(AppError::Conflict(_)) => self
                .saved
                .find(user_id, promotion_id)
                .await?
                .ok_or_else(|| AppError::InternalError("Saved promotion vanished".into())),
            Err(e) => Err(e),
        }
    }

    /// 取消收藏，返回是否确实删除
    pub async fn unsave(&self, user_id: &str, promotion_id: &str) -> AppResult<bool> {
        validate_ids(user_id, promotion_id)?;
        self.saved.delete(user_id, promotion_id).await
    }

    pub async fn is_saved(&self, user_id: &str, promotion_id: &str) -> AppResult<bool> {
        validate_ids(user_id, promotion_id)?;
        Ok(self.saved.find(user_id, promotion_id).await?.is_some())
    }

    pub async fn save_count(&self, promotion_id: &str) -> AppResult<u64> {
        self.saved.count_by_promotion(promotion_id).await
    }

    /// 用户收藏的优惠详情，按收藏时间倒序，附带 savedAt
    pub async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Promotion>> {
        let saved = self.saved.list_by_user(user_id).await?;
        if saved.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = saved.iter().map(|s| s.promotion_id.clone()).collect();
        let mut by_id: HashMap<String, Promotion> = self
            .promotions
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        // 已被删除的优惠跳过
        Ok(saved
            .into_iter()
            .filter_map(|s| {
                by_id.remove(&s.promotion_id).map(|mut p| {
                    p.saved_at = Some(s.saved_at);
                    p
                })
            })
            .collect())
    }

    pub async fn list_by_user_and_category(
        &self,
        user_id: &str,
        category: &str,
    ) -> AppResult<Vec<Promotion>> {
        let list = self.list_by_user(user_id).await?;
        Ok(list
            .into_iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect())
    }
}

fn validate_ids(user_id: &str, promotion_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::ValidationError("userId is required".into()));
    }
    if promotion_id.trim().is_empty() {
        return Err(AppError::ValidationError("promotionId is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::Repositories;

    fn promotion(id: &str, merchant: &str, category: &str) -> Promotion {
        Promotion {
            id: id.into(),
            merchant: merchant.into(),
            description: String::new(),
            expiry: "2099-01-01".into(),
            image_url: None,
            location: None,
            code: None,
            conditions: None,
            category: category.into(),
            promotion_id: None,
            saved_at: None,
        }
    }

    async fn seeded() -> SavedPromotionService {
        let repos = Repositories::in_memory();
        for p in [
            promotion("p1", "Starbucks", "Cafes"),
            promotion("p2", "FairPrice", "Groceries"),
            promotion("p3", "Coffee Bean", "Cafes"),
        ] {
            repos.promotions.insert(&p).await.unwrap();
        }
        SavedPromotionService::new(repos.saved_promotions.clone(), repos.promotions.clone())
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let svc = seeded().await;
        let first = svc.save("u1", "p1").await.unwrap();
        let second = svc.save("u1", "p1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(svc.save_count("p1").await.unwrap(), 1);

        svc.save("u2", "p1").await.unwrap();
        assert_eq!(svc.save_count("p1").await.unwrap(), 2);
        assert!(svc.is_saved("u2", "p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_unknown_promotion_fails() {
        let svc = seeded().await;
        assert!(matches!(
            svc.save("u1", "missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unsave() {
        let svc = seeded().await;
        svc.save("u1", "p2").await.unwrap();
        assert!(svc.unsave("u1", "p2").await.unwrap());
        assert!(!svc.unsave("u1", "p2").await.unwrap());
        assert!(!svc.is_saved("u1", "p2").await.unwrap());
        assert_eq!(svc.save_count("p2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_by_user_newest_first_with_saved_at() {
        let svc = seeded().await;
        svc.save("u1", "p1").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        svc.save("u1", "p2").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        svc.save("u1", "p3").await.unwrap();

        let list = svc.list_by_user("u1").await.unwrap();
        let ids: Vec<&str> = list.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p2", "p1"]);
        assert!(list.iter().all(|p| p.saved_at.is_some()));

        let cafes = svc.list_by_user_and_category("u1", "CAFES").await.unwrap();
        let ids: Vec<&str> = cafes.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p1"]);

        assert!(svc.list_by_user("u2").await.unwrap().is_empty());
    }
}
