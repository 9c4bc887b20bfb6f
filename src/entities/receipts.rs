use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Option<String>,
    pub merchant_name: String,
    /// 仅有日期时保存为当天 12:00:00
    pub date_of_purchase: DateTime<Utc>,
    pub total_expense: f64,
    pub category: String,
    pub image_url: Option<String>,
    /// 商品名称数组 (JSON)
    pub items: Option<Json>,
    pub scan_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
