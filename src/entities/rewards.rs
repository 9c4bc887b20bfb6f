use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 奖励目录
/// 不变量: quantity >= 0; is_available 为 true 时 quantity > 0（由兑换流程维护）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub image_url: Option<String>,
    /// VOUCHER / ELECTRONICS / ...
    pub category: String,
    pub is_available: bool,
    pub quantity: i32,
    pub merchant_name: Option<String>,
    pub terms_conditions: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
