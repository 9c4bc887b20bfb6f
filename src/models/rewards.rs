use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{
    point_transaction_entity, reward_entity, user_points_entity, user_reward_entity,
};

/// 代金券类奖励，兑换时生成兑换码
pub const VOUCHER_CATEGORY: &str = "VOUCHER";

pub const WELCOME_BONUS_REWARD_ID: &str = "welcome-bonus";
pub const WELCOME_BONUS_REWARD_NAME: &str = "Welcome Bonus";
pub const WELCOME_BONUS_CODE: &str = "WELCOME100";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    #[sea_orm(string_value = "EARNED")]
    Earned,
    #[sea_orm(string_value = "SPENT")]
    Spent,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Earned => write!(f, "EARNED"),
            TransactionType::Spent => write!(f, "SPENT"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EARNED" => Ok(TransactionType::Earned),
            "SPENT" => Ok(TransactionType::Spent),
            other => Err(format!("Unknown transaction type: {other}")),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointSource {
    #[sea_orm(string_value = "RECEIPT_SCAN")]
    ReceiptScan,
    #[sea_orm(string_value = "REWARD_REDEMPTION")]
    RewardRedemption,
    #[sea_orm(string_value = "WELCOME_BONUS")]
    WelcomeBonus,
    /// 兑换失败后的积分返还
    #[sea_orm(string_value = "ROLLBACK_REDEMPTION")]
    RollbackRedemption,
}

impl std::fmt::Display for PointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointSource::ReceiptScan => write!(f, "RECEIPT_SCAN"),
            PointSource::RewardRedemption => write!(f, "REWARD_REDEMPTION"),
            PointSource::WelcomeBonus => write!(f, "WELCOME_BONUS"),
            PointSource::RollbackRedemption => write!(f, "ROLLBACK_REDEMPTION"),
        }
    }
}

impl std::str::FromStr for PointSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RECEIPT_SCAN" => Ok(PointSource::ReceiptScan),
            "REWARD_REDEMPTION" => Ok(PointSource::RewardRedemption),
            "WELCOME_BONUS" => Ok(PointSource::WelcomeBonus),
            "ROLLBACK_REDEMPTION" => Ok(PointSource::RollbackRedemption),
            other => Err(format!("Unknown point source: {other}")),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "FULFILLED")]
    Fulfilled,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl std::fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedemptionStatus::Pending => write!(f, "PENDING"),
            RedemptionStatus::Fulfilled => write!(f, "FULFILLED"),
            RedemptionStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for RedemptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RedemptionStatus::Pending),
            "FULFILLED" => Ok(RedemptionStatus::Fulfilled),
            "CANCELLED" => Ok(RedemptionStatus::Cancelled),
            other => Err(format!("Unknown redemption status: {other}")),
        }
    }
}

/// 用户积分账户
/// 不变量: available_points == total_points - spent_points >= 0
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPoints {
    pub user_id: String,
    pub total_points: i64,
    pub available_points: i64,
    pub spent_points: i64,
    pub last_updated: DateTime<Utc>,
}

impl UserPoints {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_points: 0,
            available_points: 0,
            spent_points: 0,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    pub id: String,
    pub user_id: String,
    pub points: i64,
    pub transaction_type: TransactionType,
    pub source: PointSource,
    pub reference_id: String,
    pub transaction_date: DateTime<Utc>,
    pub description: String,
}

impl PointTransaction {
    pub fn new(
        user_id: &str,
        points: i64,
        transaction_type: TransactionType,
        source: PointSource,
        reference_id: &str,
        description: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            points,
            transaction_type,
            source,
            reference_id: reference_id.to_string(),
            transaction_date: Utc::now(),
            description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub image_url: Option<String>,
    pub category: String,
    pub is_available: bool,
    pub quantity: i32,
    pub merchant_name: Option<String>,
    pub terms_conditions: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Reward {
    pub fn is_voucher(&self) -> bool {
        self.category.eq_ignore_ascii_case(VOUCHER_CATEGORY)
    }

    pub fn is_redeemable(&self) -> bool {
        self.is_available && self.quantity > 0
    }
}

/// 奖励新增 / 修改请求（管理端）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    #[schema(example = "$5 FairPrice Voucher")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = 500)]
    pub points_cost: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[schema(example = "VOUCHER")]
    pub category: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub terms_conditions: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl RewardRequest {
    pub fn into_reward(self, id: String) -> Reward {
        Reward {
            id,
            name: self.name,
            description: self.description,
            points_cost: self.points_cost,
            image_url: self.image_url,
            category: self.category,
            // 库存为 0 时不可兑换
            is_available: self.is_available && self.quantity > 0,
            quantity: self.quantity,
            merchant_name: self.merchant_name,
            terms_conditions: self.terms_conditions,
            expiry_date: self.expiry_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserReward {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    pub reward_name: String,
    pub points_spent: i64,
    pub redeemed_date: DateTime<Utc>,
    pub status: RedemptionStatus,
    pub redemption_code: Option<String>,
    pub delivery_info: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    #[schema(example = "FULFILLED")]
    pub status: RedemptionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfoRequest {
    pub delivery_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeBonusResponse {
    pub points_awarded: i64,
    pub message: String,
}

/// ?days=N 查询参数
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

impl From<user_points_entity::Model> for UserPoints {
    fn from(m: user_points_entity::Model) -> Self {
        Self {
            user_id: m.user_id,
            total_points: m.total_points,
            available_points: m.available_points,
            spent_points: m.spent_points,
            last_updated: m.last_updated,
        }
    }
}

impl From<point_transaction_entity::Model> for PointTransaction {
    fn from(m: point_transaction_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            points: m.points,
            transaction_type: m.transaction_type,
            source: m.source,
            reference_id: m.reference_id,
            transaction_date: m.transaction_date,
            description: m.description,
        }
    }
}

impl From<reward_entity::Model> for Reward {
    fn from(m: reward_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            points_cost: m.points_cost,
            image_url: m.image_url,
            category: m.category,
            is_available: m.is_available,
            quantity: m.quantity,
            merchant_name: m.merchant_name,
            terms_conditions: m.terms_conditions,
            expiry_date: m.expiry_date,
        }
    }
}

impl From<user_reward_entity::Model> for UserReward {
    fn from(m: user_reward_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            reward_id: m.reward_id,
            reward_name: m.reward_name,
            points_spent: m.points_spent,
            redeemed_date: m.redeemed_date,
            status: m.status,
            redemption_code: m.redemption_code,
            delivery_info: m.delivery_info,
            expiry_date: m.expiry_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(PointSource::RollbackRedemption).unwrap(),
            "ROLLBACK_REDEMPTION"
        );
        assert_eq!(
            serde_json::to_value(TransactionType::Earned).unwrap(),
            "EARNED"
        );
        assert_eq!(
            "fulfilled".parse::<RedemptionStatus>().unwrap(),
            RedemptionStatus::Fulfilled
        );
        assert!("bogus".parse::<PointSource>().is_err());
    }

    #[test]
    fn test_reward_request_without_stock_is_unavailable() {
        let req: RewardRequest = serde_json::from_value(serde_json::json!({
            "name": "Headphones",
            "pointsCost": 2000,
            "category": "ELECTRONICS",
            "quantity": 0
        }))
        .unwrap();
        let reward = req.into_reward("r1".into());
        assert!(!reward.is_available);
        assert!(!reward.is_redeemable());
        assert!(!reward.is_voucher());
    }

    #[test]
    fn test_reward_serializes_is_available_camel_case() {
        let reward = Reward {
            id: "r1".into(),
            name: "Voucher".into(),
            description: String::new(),
            points_cost: 300,
            image_url: None,
            category: "voucher".into(),
            is_available: true,
            quantity: 2,
            merchant_name: None,
            terms_conditions: None,
            expiry_date: None,
        };
        assert!(reward.is_voucher());
        let json = serde_json::to_value(&reward).unwrap();
        assert_eq!(json["isAvailable"], true);
        assert_eq!(json["pointsCost"], 300);
    }
}
