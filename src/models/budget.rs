use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::budget_entity;

pub const DEFAULT_TOTAL_BUDGET: f64 = 1500.0;

/// 新分类默认占总预算的比例
pub const NEW_CATEGORY_SHARE: f64 = 0.05;

/// 默认分类及其占总预算的百分比，按展示顺序
pub const DEFAULT_CATEGORY_PERCENTAGES: [(&str, f64); 8] = [
    ("Groceries", 30.0),
    ("Dining", 20.0),
    ("Fast Food", 10.0),
    ("Cafes", 5.0),
    ("Retail", 15.0),
    ("Shopping", 10.0),
    ("Healthcare", 5.0),
    ("Others", 5.0),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    pub category: String,
    pub budget_amount: f64,
    #[serde(default)]
    pub spent_amount: f64,
    #[serde(default)]
    pub transactions: i64,
}

impl BudgetCategory {
    pub fn new(category: impl Into<String>, budget_amount: f64) -> Self {
        Self {
            category: category.into(),
            budget_amount,
            spent_amount: 0.0,
            transactions: 0,
        }
    }

    pub fn add_expense(&mut self, amount: f64) {
        self.spent_amount += amount;
        self.transactions += 1;
    }

    /// 扣减支出，spent 与 transactions 均不低于 0
    pub fn subtract_expense(&mut self, amount: f64) {
        self.spent_amount = (self.spent_amount - amount).max(0.0);
        self.transactions = (self.transactions - 1).max(0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub month_year: String,
    pub total_budget: f64,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default)]
    pub categories: Vec<BudgetCategory>,
    /// 乐观并发版本号，不对外暴露
    #[serde(skip)]
    pub version: i64,
}

impl Budget {
    /// 按默认模板构建预算（未持久化）
    pub fn with_defaults(user_id: &str, month_year: &str) -> Self {
        let categories = DEFAULT_CATEGORY_PERCENTAGES
            .iter()
            .map(|(name, pct)| BudgetCategory::new(*name, DEFAULT_TOTAL_BUDGET * (pct / 100.0)))
            .collect();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            month_year: month_year.to_string(),
            total_budget: DEFAULT_TOTAL_BUDGET,
            total_spent: 0.0,
            categories,
            version: 0,
        }
    }

    /// 分类名大小写不敏感匹配
    pub fn find_category_mut(&mut self, name: &str) -> Option<&mut BudgetCategory> {
        self.categories
            .iter_mut()
            .find(|c| c.category.eq_ignore_ascii_case(name))
    }

    pub fn find_category(&self, name: &str) -> Option<&BudgetCategory> {
        self.categories
            .iter()
            .find(|c| c.category.eq_ignore_ascii_case(name))
    }

    pub fn update_total_spent(&mut self) {
        self.total_spent = self.categories.iter().map(|c| c.spent_amount).sum();
    }

    pub fn add_expense(&mut self, category: &str, amount: f64) {
        let total_budget = self.total_budget;
        match self.find_category_mut(category) {
            Some(c) => c.add_expense(amount),
            None => {
                let mut c = BudgetCategory::new(category, total_budget * NEW_CATEGORY_SHARE);
                c.add_expense(amount);
                self.categories.push(c);
            }
        }
        self.update_total_spent();
    }

    /// 分类不存在时不做处理
    pub fn remove_expense(&mut self, category: &str, amount: f64) {
        if let Some(c) = self.find_category_mut(category) {
            c.subtract_expense(amount);
        }
        self.update_total_spent();
    }

    /// 修改总预算并按各分类在旧总额中的占比重新分配；旧总额为 0 时各分类归 0
    pub fn rescale_total(&mut self, new_total: f64) {
        let old_total = self.total_budget;
        for c in self.categories.iter_mut() {
            let share = if old_total > 0.0 {
                c.budget_amount / old_total
            } else {
                0.0
            };
            c.budget_amount = new_total * share;
        }
        self.total_budget = new_total;
    }

    pub fn set_category_budget(&mut self, category: &str, amount: f64) {
        match self.find_category_mut(category) {
            Some(c) => c.budget_amount = amount,
            None => self.categories.push(BudgetCategory::new(category, amount)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AmountRequest {
    #[schema(example = 2000.0)]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpenseRequest {
    #[schema(example = "Cafes")]
    pub category: String,
    #[schema(example = 12.5)]
    pub amount: f64,
}

impl TryFrom<budget_entity::Model> for Budget {
    type Error = serde_json::Error;

    fn try_from(m: budget_entity::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            user_id: m.user_id,
            month_year: m.month_year,
            total_budget: m.total_budget,
            total_spent: m.total_spent,
            categories: serde_json::from_value(m.categories)?,
            version: m.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_default_budget_distribution() {
        let b = Budget::with_defaults("u1", "2024-03");
        assert_eq!(b.total_budget, 1500.0);
        assert_eq!(b.categories.len(), 8);
        assert!(approx(b.find_category("Groceries").unwrap().budget_amount, 450.0));
        assert!(approx(b.find_category("Dining").unwrap().budget_amount, 300.0));
        assert!(approx(b.find_category("Fast Food").unwrap().budget_amount, 150.0));
        assert!(approx(b.find_category("Others").unwrap().budget_amount, 75.0));
        let sum: f64 = b.categories.iter().map(|c| c.budget_amount).sum();
        assert!(approx(sum, 1500.0));
    }

    #[test]
    fn test_add_expense_existing_category_case_insensitive() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.add_expense("cafes", 20.0);
        let c = b.find_category("Cafes").unwrap();
        assert!(approx(c.spent_amount, 20.0));
        assert_eq!(c.transactions, 1);
        assert!(approx(b.total_spent, 20.0));
        assert_eq!(b.categories.len(), 8);
    }

    #[test]
    fn test_add_expense_new_category_gets_five_percent() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.add_expense("Travel", 100.0);
        let c = b.find_category("Travel").unwrap();
        assert!(approx(c.budget_amount, 75.0));
        assert!(approx(c.spent_amount, 100.0));
        assert_eq!(c.transactions, 1);
        assert!(approx(b.total_spent, 100.0));
    }

    #[test]
    fn test_remove_expense_restores_and_clamps() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.add_expense("Retail", 30.0);
        b.remove_expense("Retail", 30.0);
        let c = b.find_category("Retail").unwrap();
        assert!(approx(c.spent_amount, 0.0));
        assert_eq!(c.transactions, 0);

        b.remove_expense("Retail", 50.0);
        let c = b.find_category("Retail").unwrap();
        assert!(approx(c.spent_amount, 0.0));
        assert_eq!(c.transactions, 0);
        assert!(approx(b.total_spent, 0.0));
    }

    #[test]
    fn test_remove_expense_missing_category_is_noop() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.add_expense("Groceries", 10.0);
        let before = b.clone();
        b.remove_expense("Unknown", 10.0);
        assert_eq!(b, before);
    }

    #[test]
    fn test_rescale_total_preserves_shares() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.rescale_total(3000.0);
        assert_eq!(b.total_budget, 3000.0);
        assert!(approx(b.find_category("Groceries").unwrap().budget_amount, 900.0));
        assert!(approx(b.find_category("Others").unwrap().budget_amount, 150.0));
        let sum: f64 = b.categories.iter().map(|c| c.budget_amount).sum();
        assert!(approx(sum, 3000.0));
    }

    #[test]
    fn test_rescale_from_zero_total_scales_to_zero() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.total_budget = 0.0;
        b.rescale_total(1000.0);
        assert_eq!(b.total_budget, 1000.0);
        assert!(b.categories.iter().all(|c| c.budget_amount == 0.0));
    }

    #[test]
    fn test_set_category_budget_inserts_when_absent() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.set_category_budget("groceries", 500.0);
        assert!(approx(b.find_category("Groceries").unwrap().budget_amount, 500.0));
        b.set_category_budget("Pets", 40.0);
        assert_eq!(b.categories.len(), 9);
        assert!(approx(b.find_category("Pets").unwrap().budget_amount, 40.0));
    }

    #[test]
    fn test_version_is_not_serialized() {
        let mut b = Budget::with_defaults("u1", "2024-03");
        b.version = 7;
        let json = serde_json::to_value(&b).unwrap();
        assert!(json.get("version").is_none());
        assert!(json.get("monthYear").is_some());
        assert!(json["categories"][0].get("budgetAmount").is_some());
    }
}
