use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 本地用户；firebase_id 在首次通过身份提供方验证后写入
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    #[sea_orm(unique)]
    pub firebase_id: Option<String>,
    /// 联合登录用户为随机占位哈希
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
