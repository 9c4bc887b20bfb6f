use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::budget_entity as budgets;
use crate::error::{AppError, AppResult};
use crate::models::Budget;
use crate::repositories::BudgetRepository;

#[derive(Clone)]
pub struct PgBudgetRepository {
    pool: DatabaseConnection,
}

impl PgBudgetRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    fn to_domain(model: budgets::Model) -> AppResult<Budget> {
        Budget::try_from(model).map_err(AppError::from)
    }
}

#[async_trait]
impl BudgetRepository for PgBudgetRepository {
    async fn find(&self, user_id: &str, month_year: &str) -> AppResult<Option<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::MonthYear.eq(month_year))
            .one(&self.pool)
            .await?
            .map(Self::to_domain)
            .transpose()
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Budget>> {
        budgets::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await?
            .map(Self::to_domain)
            .transpose()
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_asc(budgets::Column::MonthYear)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(Self::to_domain)
            .collect()
    }

    async fn insert(&self, budget: &Budget) -> AppResult<Budget> {
        let now = Utc::now();
        let model = budgets::ActiveModel {
            id: Set(budget.id.clone()),
            user_id: Set(budget.user_id.clone()),
            month_year: Set(budget.month_year.clone()),
            total_budget: Set(budget.total_budget),
            total_spent: Set(budget.total_spent),
            categories: Set(serde_json::to_value(&budget.categories)?),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await
        .map_err(|e| AppError::from_insert(e, "Budget"))?;
        Self::to_domain(model)
    }

    async fn compare_and_swap(&self, budget: &Budget) -> AppResult<Option<Budget>> {
        // 乐观锁: where id = ? and version = ?，命中 1 行即成功
        let next_version = budget.version + 1;
        let result = budgets::Entity::update_many()
            .set(budgets::ActiveModel {
                total_budget: Set(budget.total_budget),
                total_spent: Set(budget.total_spent),
                categories: Set(serde_json::to_value(&budget.categories)?),
                version: Set(next_version),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(budgets::Column::Id.eq(budget.id.clone()))
            .filter(budgets::Column::Version.eq(budget.version))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 1 {
            let mut stored = budget.clone();
            stored.version = next_version;
            Ok(Some(stored))
        } else if self.find_by_id(&budget.id).await?.is_none() {
            Err(AppError::NotFound("Budget not found".into()))
        } else {
            Ok(None)
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let res = budgets::Entity::delete_by_id(id.to_string())
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }
}
