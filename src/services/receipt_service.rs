use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{CreateReceiptRequest, CreateReceiptResponse, DEFAULT_CATEGORY, Receipt};
use crate::repositories::ReceiptRepository;
use crate::services::{BudgetService, RewardsService};
use crate::utils::{generate_id, month_key, parse_purchase_date_or_now};

#[derive(Clone)]
pub struct ReceiptService {
    receipts: Arc<dyn ReceiptRepository>,
    budgets: BudgetService,
    rewards: RewardsService,
}

impl ReceiptService {
    pub fn new(
        receipts: Arc<dyn ReceiptRepository>,
        budgets: BudgetService,
        rewards: RewardsService,
    ) -> Self {
        Self {
            receipts,
            budgets,
            rewards,
        }
    }

    /// 保存小票，随后计入预算并发放积分。
    /// 后两步失败只记录日志，小票保留。
    pub async fn create_receipt(&self, req: CreateReceiptRequest) -> AppResult<CreateReceiptResponse> {
        let receipt = build_receipt(req)?;
        let receipt = self.receipts.insert(&receipt).await?;
        log::info!(
            "Receipt {} saved for user {:?}, total {:.2}",
            receipt.id,
            receipt.user_id,
            receipt.total_expense
        );

        let Some(user_id) = receipt.user_id.clone() else {
            return Ok(CreateReceiptResponse {
                receipt,
                points_awarded: 0,
            });
        };

        if receipt.total_expense > 0.0 {
            let month = month_key(&receipt.date_of_purchase);
            if let Err(e) = self
                .budgets
                .add_expense(&user_id, &month, &receipt.category, receipt.total_expense)
                .await
            {
                log::error!(
                    "Failed to apply receipt {} to budget {user_id}/{month}: {e}",
                    receipt.id
                );
            }
        }

        let points_awarded = match self.rewards.award_points_for_receipt(&receipt.id).await {
            Ok(tx) => tx.points,
            Err(e) => {
                log::error!("Failed to award points for receipt {}: {e}", receipt.id);
                0
            }
        };

        Ok(CreateReceiptResponse {
            receipt,
            points_awarded,
        })
    }

    pub async fn get_receipt(&self, receipt_id: &str) -> AppResult<Receipt> {
        self.receipts
            .find_by_id(receipt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Receipt {receipt_id} not found")))
    }

    pub async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Receipt>> {
        self.receipts.list_by_user(user_id).await
    }

    /// 按购买日期倒序
    pub async fn recent_by_user(&self, user_id: &str) -> AppResult<Vec<Receipt>> {
        let mut list = self.receipts.list_by_user(user_id).await?;
        list.sort_by(|a, b| b.date_of_purchase.cmp(&a.date_of_purchase));
        Ok(list)
    }

    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        self.receipts.count_by_user(user_id).await
    }

    /// 删除小票并尽力回退预算，已发放积分保留。
    /// 小票删除后预算回退失败只记录日志。
    pub async fn delete_receipt(&self, receipt_id: &str) -> AppResult<()> {
        let receipt = self.get_receipt(receipt_id).await?;
        if !self.receipts.delete(receipt_id).await? {
            return Err(AppError::NotFound(format!("Receipt {receipt_id} not found")));
        }

        if let Some(user_id) = receipt.user_id.as_deref()
            && receipt.total_expense > 0.0
        {
            let month = month_key(&receipt.date_of_purchase);
            if let Err(e) = self
                .budgets
                .remove_expense(user_id, &month, &receipt.category, receipt.total_expense)
                .await
            {
                log::warn!(
                    "Receipt {receipt_id} deleted but budget {month} of user {user_id} was not reverted: {e}"
                );
            }
        }
        log::info!("Receipt {receipt_id} deleted");
        Ok(())
    }
}

/// 将宽松类型的请求转换为小票
fn build_receipt(req: CreateReceiptRequest) -> AppResult<Receipt> {
    let total = match req.total_expense.as_ref().or(req.total_amount.as_ref()) {
        None | Some(Value::Null) => 0.0,
        Some(v) => value_as_f64(v).ok_or_else(|| {
            AppError::ValidationError(format!("Invalid totalExpense: {v}"))
        })?,
    };
    if !total.is_finite() || total < 0.0 {
        return Err(AppError::ValidationError(
            "totalExpense must be a non-negative number".into(),
        ));
    }

    let user_id = req.user_id.as_ref().and_then(value_as_string);
    let merchant_name = req
        .merchant_name
        .as_ref()
        .and_then(value_as_string)
        .unwrap_or_default();
    let category = req
        .category
        .as_ref()
        .and_then(value_as_string)
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let raw_date = req.date_of_purchase.as_ref().and_then(value_as_string);

    Ok(Receipt {
        id: generate_id(),
        user_id,
        merchant_name,
        date_of_purchase: parse_purchase_date_or_now(raw_date.as_deref()),
        total_expense: total,
        category,
        image_url: req.image_url.as_ref().and_then(value_as_string),
        items: req.items.as_ref().and_then(parse_items),
        scan_date: Utc::now(),
    })
}

/// 字符串或数字转为非空字符串
fn value_as_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// 数字或数字字符串（允许 `$` 前缀与逗号小数点）
fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim().trim_start_matches('$').replace(',', ".");
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse().ok()
            }
        }
        _ => None,
    }
}

/// items 可为字符串数组，或带 name 字段的对象数组
fn parse_items(v: &Value) -> Option<Vec<String>> {
    let list = v.as_array()?;
    let items: Vec<String> = list
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => obj.get("name").and_then(value_as_string),
            other => value_as_string(other),
        })
        .collect();
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLayer;
    use crate::config::RewardsConfig;
    use crate::models::Budget;
    use crate::repositories::{BudgetRepository, Repositories};
    use async_trait::async_trait;
    use serde_json::json;

    fn request(v: Value) -> CreateReceiptRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_build_receipt_tolerates_string_numbers() {
        let r = build_receipt(request(json!({
            "userId": "u1",
            "merchantName": "Starbucks",
            "totalExpense": "20.50",
            "dateOfPurchase": "03/04/2024",
            "items": [{"name": "Latte", "price": 6.5}, {"price": 1.0}]
        })))
        .unwrap();
        assert_eq!(r.user_id.as_deref(), Some("u1"));
        assert!((r.total_expense - 20.5).abs() < 1e-9);
        assert_eq!(r.category, "Others");
        assert_eq!(r.items, Some(vec!["Latte".to_string()]));
        assert_eq!(month_key(&r.date_of_purchase), "2024-04");
    }

    #[test]
    fn test_build_receipt_legacy_total_amount_and_string_items() {
        let r = build_receipt(request(json!({
            "userId": 42,
            "totalAmount": 7,
            "category": "Cafes",
            "items": ["Kopi", "Kaya toast"]
        })))
        .unwrap();
        assert_eq!(r.user_id.as_deref(), Some("42"));
        assert!((r.total_expense - 7.0).abs() < 1e-9);
        assert_eq!(r.category, "Cafes");
        assert_eq!(r.items.unwrap().len(), 2);
    }

    #[test]
    fn test_build_receipt_rejects_bad_amount() {
        let res = build_receipt(request(json!({"totalExpense": "twelve"})));
        assert!(matches!(res, Err(AppError::ValidationError(_))));
        let res = build_receipt(request(json!({"totalExpense": -1})));
        assert!(matches!(res, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_blank_user_is_anonymous() {
        let r = build_receipt(request(json!({"userId": "  ", "totalExpense": 1}))).unwrap();
        assert!(r.user_id.is_none());
    }

    /// 写入总是失败的预算仓库
    struct BrokenBudgets {
        inner: Arc<dyn BudgetRepository>,
    }

    #[async_trait]
    impl BudgetRepository for BrokenBudgets {
        async fn find(&self, user_id: &str, month_year: &str) -> AppResult<Option<Budget>> {
            self.inner.find(user_id, month_year).await
        }
        async fn find_by_id(&self, id: &str) -> AppResult<Option<Budget>> {
            self.inner.find_by_id(id).await
        }
        async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Budget>> {
            self.inner.list_by_user(user_id).await
        }
        async fn insert(&self, budget: &Budget) -> AppResult<Budget> {
            self.inner.insert(budget).await
        }
        async fn compare_and_swap(&self, _budget: &Budget) -> AppResult<Option<Budget>> {
            Err(AppError::InternalError("budget store unavailable".into()))
        }
        async fn delete(&self, id: &str) -> AppResult<bool> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_budget_revert_fails() {
        let repos = Repositories::in_memory();
        let budgets = BudgetService::new(
            Arc::new(BrokenBudgets {
                inner: repos.budgets.clone(),
            }),
            CacheLayer::in_memory(std::time::Duration::from_secs(60)),
        );
        let rewards = RewardsService::new(
            repos.receipts.clone(),
            repos.points.clone(),
            repos.ledger.clone(),
            repos.rewards.clone(),
            repos.user_rewards.clone(),
            RewardsConfig::default(),
        );
        let service = ReceiptService::new(repos.receipts.clone(), budgets, rewards);

        let created = service
            .create_receipt(request(json!({
                "userId": "u1",
                "merchantName": "Starbucks",
                "totalExpense": 12.5,
                "category": "Cafes"
            })))
            .await
            .unwrap();
        let id = created.receipt.id;

        service.delete_receipt(&id).await.unwrap();
        assert!(matches!(
            service.get_receipt(&id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
