use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entities::receipt_entity;

pub const DEFAULT_CATEGORY: &str = "Others";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    pub user_id: Option<String>,
    pub merchant_name: String,
    pub date_of_purchase: DateTime<Utc>,
    pub total_expense: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub items: Option<Vec<String>>,
    pub scan_date: DateTime<Utc>,
}

/// 创建小票请求：字段类型宽松（数字可能以字符串传入，items 可为字符串或对象数组）
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptRequest {
    #[schema(value_type = Option<String>, example = "kT9sQf2mXvU1")]
    pub user_id: Option<Value>,
    #[schema(value_type = Option<String>, example = "FairPrice Finest")]
    pub merchant_name: Option<Value>,
    #[schema(value_type = Option<f64>, example = 20.5)]
    pub total_expense: Option<Value>,
    /// 旧客户端字段，等同 totalExpense
    #[schema(value_type = Option<f64>)]
    pub total_amount: Option<Value>,
    #[schema(value_type = Option<String>, example = "03/04/2024")]
    pub date_of_purchase: Option<Value>,
    #[schema(value_type = Option<String>, example = "Groceries")]
    pub category: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Value>,
    #[schema(value_type = Option<Vec<String>>)]
    pub items: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptResponse {
    pub receipt: Receipt,
    pub points_awarded: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

impl From<receipt_entity::Model> for Receipt {
    fn from(m: receipt_entity::Model) -> Self {
        let items = m
            .items
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok());
        Self {
            id: m.id,
            user_id: m.user_id,
            merchant_name: m.merchant_name,
            date_of_purchase: m.date_of_purchase,
            total_expense: m.total_expense,
            category: m.category,
            image_url: m.image_url,
            items,
            scan_date: m.scan_date,
        }
    }
}
