use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 月度预算
/// - categories: BudgetCategory 数组 (JSON)
/// - version: 每次写入 +1，更新时按旧版本号做比较交换
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    /// YYYY-MM
    pub month_year: String,
    pub total_budget: f64,
    pub total_spent: f64,
    pub categories: Json,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
