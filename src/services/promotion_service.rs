use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{CacheLayer, keys};
use crate::error::{AppError, AppResult};
use crate::models::{Promotion, PromotionRequest};
use crate::repositories::{PromotionRepository, ReceiptRepository};
use crate::utils::generate_id;

/// 小票缺少商家与分类时按小票 id 回退的分类（演示数据用）
const RECEIPT_CATEGORY_FALLBACK: [(&str, &str); 3] =
    [("1", "Groceries"), ("2", "Cafes"), ("3", "Fast Food")];

#[derive(Clone)]
pub struct PromotionService {
    promotions: Arc<dyn PromotionRepository>,
    receipts: Arc<dyn ReceiptRepository>,
    cache: CacheLayer,
}

impl PromotionService {
    pub fn new(
        promotions: Arc<dyn PromotionRepository>,
        receipts: Arc<dyn ReceiptRepository>,
        cache: CacheLayer,
    ) -> Self {
        Self {
            promotions,
            receipts,
            cache,
        }
    }

    pub async fn list_all(&self) -> AppResult<Vec<Promotion>> {
        let key = keys::promotions_all();
        if let Some(list) = self.cache.get::<Vec<Promotion>>(&key).await {
            return Ok(list);
        }
        let list = self.promotions.list_all().await?;
        self.cache.put(&key, &list).await;
        Ok(list)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Promotion> {
        let key = keys::promotion(id);
        if let Some(promotion) = self.cache.get::<Promotion>(&key).await {
            return Ok(promotion);
        }
        let promotion = self
            .promotions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promotion {id} not found")))?;
        self.cache.put(&key, &promotion).await;
        Ok(promotion)
    }

    pub async fn get_by_promotion_id(&self, promotion_id: i32) -> AppResult<Promotion> {
        self.promotions
            .find_by_promotion_id(promotion_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promotion #{promotion_id} not found")))
    }

    pub async fn by_category(&self, category: &str) -> AppResult<Vec<Promotion>> {
        let key = keys::promotions_by_category(category);
        if let Some(list) = self.cache.get::<Vec<Promotion>>(&key).await {
            return Ok(list);
        }
        let list = self.promotions.list_by_category(category).await?;
        self.cache.put(&key, &list).await;
        Ok(list)
    }

    pub async fn by_merchant(&self, merchant: &str) -> AppResult<Vec<Promotion>> {
        let key = keys::promotions_by_merchant(merchant);
        if let Some(list) = self.cache.get::<Vec<Promotion>>(&key).await {
            return Ok(list);
        }
        let list = self.promotions.search_merchant(merchant).await?;
        self.cache.put(&key, &list).await;
        Ok(list)
    }

    /// 商家名或描述包含关键字
    pub async fn search(&self, query: &str) -> AppResult<Vec<Promotion>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::ValidationError("query is required".into()));
        }
        self.promotions.search_text(query).await
    }

    /// 到期日晚于今天
    pub async fn active(&self) -> AppResult<Vec<Promotion>> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.promotions.list_expiring_after(&today).await
    }

    /// 组合匹配：同时给出时取商家（含描述）与分类结果的并集，都未给出返回全部
    pub async fn match_promotions(
        &self,
        merchant: Option<&str>,
        category: Option<&str>,
    ) -> AppResult<Vec<Promotion>> {
        let merchant = merchant.map(str::trim).filter(|m| !m.is_empty());
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        match (merchant, category) {
            (None, None) => self.list_all().await,
            (Some(m), None) => self.promotions.search_text(m).await,
            (None, Some(c)) => self.by_category(c).await,
            (Some(m), Some(c)) => {
                let mut list = self.promotions.search_text(m).await?;
                let mut seen: HashSet<String> = list.iter().map(|p| p.id.clone()).collect();
                for p in self.by_category(c).await? {
                    if seen.insert(p.id.clone()) {
                        list.push(p);
                    }
                }
                Ok(list)
            }
        }
    }

    /// 与小票商家、分类相关的优惠
    pub async fn for_receipt(&self, receipt_id: &str) -> AppResult<Vec<Promotion>> {
        let receipt = self
            .receipts
            .find_by_id(receipt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Receipt {receipt_id} not found")))?;

        let merchant = Some(receipt.merchant_name.as_str()).filter(|m| !m.trim().is_empty());
        let category = Some(receipt.category.as_str()).filter(|c| !c.trim().is_empty());
        if merchant.is_some() || category.is_some() {
            return self.match_promotions(merchant, category).await;
        }

        match RECEIPT_CATEGORY_FALLBACK
            .iter()
            .find(|(id, _)| *id == receipt_id)
        {
            Some((_, category)) => self.by_category(category).await,
            None => Ok(Vec::new()),
        }
    }

    // ---------- 管理端 ----------

    pub async fn create(&self, req: PromotionRequest) -> AppResult<Promotion> {
        validate_promotion(&req)?;
        let promotion = self
            .promotions
            .insert(&req.into_promotion(generate_id()))
            .await?;
        self.invalidate().await;
        Ok(promotion)
    }

    pub async fn update(&self, id: &str, req: PromotionRequest) -> AppResult<Promotion> {
        validate_promotion(&req)?;
        if self.promotions.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(format!("Promotion {id} not found")));
        }
        let promotion = self
            .promotions
            .update(&req.into_promotion(id.to_string()))
            .await?;
        self.invalidate().await;
        Ok(promotion)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.promotions.delete(id).await? {
            return Err(AppError::NotFound(format!("Promotion {id} not found")));
        }
        self.invalidate().await;
        Ok(())
    }

    async fn invalidate(&self) {
        self.cache.invalidate_prefix(keys::PROMOTIONS_PREFIX).await;
    }
}

fn validate_promotion(req: &PromotionRequest) -> AppResult<()> {
    if req.merchant.trim().is_empty() {
        return Err(AppError::ValidationError("merchant is required".into()));
    }
    if req.category.trim().is_empty() {
        return Err(AppError::ValidationError("category is required".into()));
    }
    if chrono::NaiveDate::parse_from_str(&req.expiry, "%Y-%m-%d").is_err() {
        return Err(AppError::ValidationError(
            "expiry must be a date in YYYY-MM-DD format".into(),
        ));
    }
    Ok(())
}
