use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::{point_transaction_entity as ledger, user_points_entity as points};
use crate::error::{AppError, AppResult};
use crate::models::{PointSource, PointTransaction, UserPoints};
use crate::repositories::{LedgerRepository, PointsRepository};

#[derive(Clone)]
pub struct PgPointsRepository {
    pool: DatabaseConnection,
}

impl PgPointsRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    async fn load(&self, user_id: &str) -> AppResult<UserPoints> {
        self.find(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Points account for {user_id} not found")))
    }
}

#[async_trait]
impl PointsRepository for PgPointsRepository {
    async fn find(&self, user_id: &str) -> AppResult<Option<UserPoints>> {
        Ok(points::Entity::find()
            .filter(points::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn ensure(&self, user_id: &str) -> AppResult<UserPoints> {
        if let Some(existing) = self.find(user_id).await? {
            return Ok(existing);
        }
        let inserted = points::ActiveModel {
            user_id: Set(user_id.to_string()),
            total_points: Set(0),
            available_points: Set(0),
            spent_points: Set(0),
            last_updated: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await;

        match inserted {
            Ok(model) => Ok(model.into()),
            // 并发创建：唯一索引冲突后重新读取
            Err(e) => match AppError::from_insert(e, "Points account") {
                AppError::Conflict(_) => self.load(user_id).await,
                other => Err(other),
            },
        }
    }

    async fn credit(&self, user_id: &str, amount: i64) -> AppResult<UserPoints> {
        self.ensure(user_id).await?;
        add_points(&self.pool, user_id, amount).await?;
        self.load(user_id).await
    }

    async fn credit_with_entry(&self, tx: &PointTransaction) -> AppResult<UserPoints> {
        self.ensure(&tx.user_id).await?;

        let txn = self.pool.begin().await?;
        entry_model(tx)
            .insert(&txn)
            .await
            .map_err(|e| AppError::from_insert(e, "Point transaction"))?;
        add_points(&txn, &tx.user_id, tx.points).await?;
        txn.commit().await?;

        self.load(&tx.user_id).await
    }

    async fn debit_with_entry(&self, tx: &PointTransaction) -> AppResult<Option<UserPoints>> {
        let txn = self.pool.begin().await?;

        // 条件扣减 (where available_points >= amount)
        let result = points::Entity::update_many()
            .col_expr(
                points::Column::AvailablePoints,
                Expr::col(points::Column::AvailablePoints).sub(tx.points),
            )
            .col_expr(
                points::Column::SpentPoints,
                Expr::col(points::Column::SpentPoints).add(tx.points),
            )
            .col_expr(points::Column::LastUpdated, Expr::value(Utc::now()))
            .filter(points::Column::UserId.eq(tx.user_id.as_str()))
            .filter(points::Column::AvailablePoints.gte(tx.points))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(None);
        }

        entry_model(tx)
            .insert(&txn)
            .await
            .map_err(|e| AppError::from_insert(e, "Point transaction"))?;
        txn.commit().await?;

        Ok(Some(self.load(&tx.user_id).await?))
    }
}

async fn add_points<C: ConnectionTrait>(db: &C, user_id: &str, amount: i64) -> Result<(), DbErr> {
    points::Entity::update_many()
        .col_expr(
            points::Column::TotalPoints,
            Expr::col(points::Column::TotalPoints).add(amount),
        )
        .col_expr(
            points::Column::AvailablePoints,
            Expr::col(points::Column::AvailablePoints).add(amount),
        )
        .col_expr(points::Column::LastUpdated, Expr::value(Utc::now()))
        .filter(points::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

fn entry_model(tx: &PointTransaction) -> ledger::ActiveModel {
    ledger::ActiveModel {
        id: Set(tx.id.clone()),
        user_id: Set(tx.user_id.clone()),
        points: Set(tx.points),
        transaction_type: Set(tx.transaction_type),
        source: Set(tx.source),
        reference_id: Set(tx.reference_id.clone()),
        description: Set(tx.description.clone()),
        transaction_date: Set(tx.transaction_date),
    }
}

#[derive(Clone)]
pub struct PgLedgerRepository {
    pool: DatabaseConnection,
}

impl PgLedgerRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<PointTransaction>> {
        let list = ledger::Entity::find()
            .filter(ledger::Column::UserId.eq(user_id))
            .order_by_desc(ledger::Column::TransactionDate)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn list_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<PointTransaction>> {
        let list = ledger::Entity::find()
            .filter(ledger::Column::UserId.eq(user_id))
            .filter(ledger::Column::TransactionDate.gt(since))
            .order_by_desc(ledger::Column::TransactionDate)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn exists_by_source(&self, user_id: &str, source: PointSource) -> AppResult<bool> {
        let count = ledger::Entity::find()
            .filter(ledger::Column::UserId.eq(user_id))
            .filter(ledger::Column::Source.eq(source))
            .count(&self.pool)
            .await?;
        Ok(count > 0)
    }
}
