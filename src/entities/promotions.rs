use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub merchant: String,
    pub description: String,
    /// ISO 日期字符串，可按字典序比较
    pub expiry: String,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub code: Option<String>,
    pub conditions: Option<String>,
    pub category: String,
    /// 外部数字编号
    pub promotion_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
