use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::receipt_entity as receipts;
use crate::error::{AppError, AppResult};
use crate::models::Receipt;
use crate::repositories::ReceiptRepository;

#[derive(Clone)]
pub struct PgReceiptRepository {
    pool: DatabaseConnection,
}

impl PgReceiptRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReceiptRepository for PgReceiptRepository {
    async fn insert(&self, receipt: &Receipt) -> AppResult<Receipt> {
        let items = match &receipt.items {
            Some(items) => Some(serde_json::to_value(items)?),
            None => None,
        };
        let model = receipts::ActiveModel {
            id: Set(receipt.id.clone()),
            user_id: Set(receipt.user_id.clone()),
            merchant_name: Set(receipt.merchant_name.clone()),
            date_of_purchase: Set(receipt.date_of_purchase),
            total_expense: Set(receipt.total_expense),
            category: Set(receipt.category.clone()),
            image_url: Set(receipt.image_url.clone()),
            items: Set(items),
            scan_date: Set(receipt.scan_date),
        }
        .insert(&self.pool)
        .await
        .map_err(|e| AppError::from_insert(e, "Receipt"))?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Receipt>> {
        Ok(receipts::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Receipt>> {
        let list = receipts::Entity::find()
            .filter(receipts::Column::UserId.eq(user_id))
            .order_by_asc(receipts::Column::ScanDate)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Ok(receipts::Entity::find()
            .filter(receipts::Column::UserId.eq(user_id))
            .count(&self.pool)
            .await?)
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let res = receipts::Entity::delete_by_id(id.to_string())
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }
}
