use crate::models::{PointSource, TransactionType};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 积分流水，只追加不修改
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "point_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub points: i64,
    pub transaction_type: TransactionType,
    pub source: PointSource,
    pub reference_id: String,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
