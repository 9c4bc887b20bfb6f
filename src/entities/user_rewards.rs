use crate::models::RedemptionStatus;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    /// 兑换时的奖励名称快照
    pub reward_name: String,
    pub points_spent: i64,
    pub redeemed_date: DateTime<Utc>,
    pub status: RedemptionStatus,
    pub redemption_code: Option<String>,
    pub delivery_info: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
