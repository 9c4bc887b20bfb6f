use std::sync::Arc;

use crate::cache::{CacheLayer, keys};
use crate::error::{AppError, AppResult};
use crate::models::Budget;
use crate::repositories::BudgetRepository;
use crate::utils::normalize_month_key;

/// 比较交换的最大尝试次数
const MAX_CAS_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct BudgetService {
    budgets: Arc<dyn BudgetRepository>,
    cache: CacheLayer,
}

impl BudgetService {
    pub fn new(budgets: Arc<dyn BudgetRepository>, cache: CacheLayer) -> Self {
        Self { budgets, cache }
    }

    /// 获取月度预算，不存在时按默认模板创建
    pub async fn get_user_budget(&self, user_id: &str, month_year: &str) -> AppResult<Budget> {
        let month_year = normalize_month_key(Some(month_year))?;
        validate_user(user_id)?;

        let key = keys::budget(user_id, &month_year);
        if let Some(budget) = self.cache.get::<Budget>(&key).await {
            return Ok(budget);
        }
        let budget = self.load_or_create(user_id, &month_year).await?;
        self.cache.put(&key, &budget).await;
        Ok(budget)
    }

    pub async fn list_user_budgets(&self, user_id: &str) -> AppResult<Vec<Budget>> {
        validate_user(user_id)?;
        let key = keys::budgets_all(user_id);
        if let Some(list) = self.cache.get::<Vec<Budget>>(&key).await {
            return Ok(list);
        }
        let list = self.budgets.list_by_user(user_id).await?;
        self.cache.put(&key, &list).await;
        Ok(list)
    }

    /// 整体保存：同一用户同一月份已存在时覆盖其内容
    pub async fn save_budget(&self, mut budget: Budget) -> AppResult<Budget> {
        validate_user(&budget.user_id)?;
        budget.month_year = normalize_month_key(Some(&budget.month_year))?;
        validate_amount("totalBudget", budget.total_budget)?;
        for c in &budget.categories {
            if c.category.trim().is_empty() {
                return Err(AppError::ValidationError("Category name is required".into()));
            }
            validate_amount("budgetAmount", c.budget_amount)?;
            validate_amount("spentAmount", c.spent_amount)?;
            if c.transactions < 0 {
                return Err(AppError::ValidationError(
                    "transactions must not be negative".into(),
                ));
            }
        }
        budget.update_total_spent();

        let user_id = budget.user_id.clone();
        let month_year = budget.month_year.clone();
        let incoming = budget.clone();
        let saved = match self.budgets.find(&user_id, &month_year).await? {
            Some(_) => {
                self.mutate(&user_id, &month_year, move |b| {
                    b.total_budget = incoming.total_budget;
                    b.categories = incoming.categories.clone();
                })
                .await?
            }
            None => {
                if budget.id.trim().is_empty() {
                    budget.id = crate::utils::generate_id();
                }
                budget.version = 0;
                match self.budgets.insert(&budget).await {
                    Ok(saved) => {
                        self.refresh_cache(&saved).await;
                        saved
                    }
                    // 并发创建了同月预算，改为覆盖
                    Err(AppError::Conflict(_)) => {
                        self.mutate(&user_id, &month_year, move |b| {
                            b.total_budget = incoming.total_budget;
                            b.categories = incoming.categories.clone();
                        })
                        .await?
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        Ok(saved)
    }

    /// 修改总预算，各分类按原占比缩放
    pub async fn update_total_budget(
        &self,
        user_id: &str,
        month_year: &str,
        amount: f64,
    ) -> AppResult<Budget> {
        validate_amount("amount", amount)?;
        let month_year = normalize_month_key(Some(month_year))?;
        validate_user(user_id)?;
        self.mutate(user_id, &month_year, |b| b.rescale_total(amount))
            .await
    }

    pub async fn update_category_budget(
        &self,
        user_id: &str,
        month_year: &str,
        category: &str,
        amount: f64,
    ) -> AppResult<Budget> {
        validate_amount("amount", amount)?;
        validate_category(category)?;
        let month_year = normalize_month_key(Some(month_year))?;
        validate_user(user_id)?;
        self.mutate(user_id, &month_year, |b| b.set_category_budget(category, amount))
            .await
    }

    pub async fn add_expense(
        &self,
        user_id: &str,
        month_year: &str,
        category: &str,
        amount: f64,
    ) -> AppResult<Budget> {
        validate_amount("amount", amount)?;
        validate_category(category)?;
        let month_year = normalize_month_key(Some(month_year))?;
        validate_user(user_id)?;
        self.mutate(user_id, &month_year, |b| b.add_expense(category, amount))
            .await
    }

    pub async fn remove_expense(
        &self,
        user_id: &str,
        month_year: &str,
        category: &str,
        amount: f64,
    ) -> AppResult<Budget> {
        validate_amount("amount", amount)?;
        let month_year = normalize_month_key(Some(month_year))?;
        validate_user(user_id)?;
        self.mutate(user_id, &month_year, |b| b.remove_expense(category, amount))
            .await
    }

    pub async fn delete_budget(&self, budget_id: &str) -> AppResult<()> {
        let budget = self
            .budgets
            .find_by_id(budget_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Budget {budget_id} not found")))?;
        self.budgets.delete(budget_id).await?;
        self.cache
            .invalidate_prefix(&keys::budgets_prefix(&budget.user_id))
            .await;
        Ok(())
    }

    async fn load_or_create(&self, user_id: &str, month_year: &str) -> AppResult<Budget> {
        if let Some(budget) = self.budgets.find(user_id, month_year).await? {
            return Ok(budget);
        }
        let fresh = Budget::with_defaults(user_id, month_year);
        match self.budgets.insert(&fresh).await {
            Ok(created) => {
                log::info!("Created default budget {} for user {user_id} month {month_year}", created.id);
                self.cache.invalidate(&keys::budgets_all(user_id)).await;
                Ok(created)
            }
            // 并发请求已创建，读取已有记录
            Err(AppError::Conflict(_)) => self
                .budgets
                .find(user_id, month_year)
                .await?
                .ok_or_else(|| AppError::InternalError("Budget vanished after conflict".into())),
            Err(e) => Err(e),
        }
    }

    /// 读取-修改-比较交换，版本冲突时重读重试
    async fn mutate<F>(&self, user_id: &str, month_year: &str, apply: F) -> AppResult<Budget>
    where
        F: Fn(&mut Budget),
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut budget = self.load_or_create(user_id, month_year).await?;
            apply(&mut budget);
            budget.update_total_spent();
            if let Some(saved) = self.budgets.compare_and_swap(&budget).await? {
                self.refresh_cache(&saved).await;
                return Ok(saved);
            }
            log::debug!(
                "Budget {} version conflict (attempt {attempt}/{MAX_CAS_ATTEMPTS})",
                budget.id
            );
        }
        // 放弃前清掉可能过期的缓存
        self.cache
            .invalidate_prefix(&keys::budgets_prefix(user_id))
            .await;
        Err(AppError::Conflict(format!(
            "Budget for {user_id} {month_year} is being modified concurrently, please retry"
        )))
    }

    async fn refresh_cache(&self, budget: &Budget) {
        self.cache
            .put(&keys::budget(&budget.user_id, &budget.month_year), budget)
            .await;
        self.cache.invalidate(&keys::budgets_all(&budget.user_id)).await;
    }
}

fn validate_user(user_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::ValidationError("userId is required".into()));
    }
    Ok(())
}

fn validate_category(category: &str) -> AppResult<()> {
    if category.trim().is_empty() {
        return Err(AppError::ValidationError("category is required".into()));
    }
    Ok(())
}

fn validate_amount(field: &str, amount: f64) -> AppResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::ValidationError(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}
