use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{promotion_entity, saved_promotion_entity};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub merchant: String,
    pub description: String,
    /// ISO 日期 (YYYY-MM-DD)
    pub expiry: String,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub code: Option<String>,
    pub conditions: Option<String>,
    pub category: String,
    pub promotion_id: Option<i32>,
    /// 仅在收藏列表中附带，不落库
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRequest {
    #[schema(example = "Starbucks")]
    pub merchant: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "2026-12-31")]
    pub expiry: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub conditions: Option<String>,
    #[schema(example = "Cafes")]
    pub category: String,
    #[serde(default)]
    pub promotion_id: Option<i32>,
}

impl PromotionRequest {
    pub fn into_promotion(self, id: String) -> Promotion {
        Promotion {
            id,
            merchant: self.merchant,
            description: self.description,
            expiry: self.expiry,
            image_url: self.image_url,
            location: self.location,
            code: self.code,
            conditions: self.conditions,
            category: self.category,
            promotion_id: self.promotion_id,
            saved_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedPromotion {
    pub id: String,
    pub user_id: String,
    pub promotion_id: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchQuery {
    pub merchant: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedStatusResponse {
    pub saved: bool,
}

impl From<promotion_entity::Model> for Promotion {
    fn from(m: promotion_entity::Model) -> Self {
        Self {
            id: m.id,
            merchant: m.merchant,
            description: m.description,
            expiry: m.expiry,
            image_url: m.image_url,
            location: m.location,
            code: m.code,
            conditions: m.conditions,
            category: m.category,
            promotion_id: m.promotion_id,
            saved_at: None,
        }
    }
}

impl From<saved_promotion_entity::Model> for SavedPromotion {
    fn from(m: saved_promotion_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            promotion_id: m.promotion_id,
            saved_at: m.saved_at,
        }
    }
}
