mod common;

use serde_json::json;

use common::{approx, build_services};
use paperworth_backend::AppError;
use paperworth_backend::models::{
    CreateReceiptRequest, PointSource, Reward, TransactionType, VOUCHER_CATEGORY,
};

fn receipt_request(v: serde_json::Value) -> CreateReceiptRequest {
    serde_json::from_value(v).unwrap()
}

#[tokio::test]
async fn create_then_delete_restores_budget_and_keeps_points() {
    let (services, _) = build_services();

    let before = services
        .budgets
        .get_user_budget("u1", "2024-04")
        .await
        .unwrap();
    let cafes_before = before.find_category("Cafes").unwrap().clone();

    let created = services
        .receipts
        .create_receipt(receipt_request(json!({
            "userId": "u1",
            "merchantName": "Starbucks",
            "totalExpense": 20,
            "category": "Cafes",
            "dateOfPurchase": "03/04/2024"
        })))
        .await
        .unwrap();
    assert_eq!(created.points_awarded, 20);

    let after = services
        .budgets
        .get_user_budget("u1", "2024-04")
        .await
        .unwrap();
    let cafes = after.find_category("Cafes").unwrap();
    assert!(approx(cafes.spent_amount, cafes_before.spent_amount + 20.0));
    assert_eq!(cafes.transactions, cafes_before.transactions + 1);
    let sum: f64 = after.categories.iter().map(|c| c.spent_amount).sum();
    assert!(approx(after.total_spent, sum));

    let points = services.rewards.user_points("u1").await.unwrap();
    assert_eq!(points.available_points, 20);

    let scans = services
        .rewards
        .transactions_by_source("u1", PointSource::ReceiptScan)
        .await
        .unwrap();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].reference_id, created.receipt.id);

    services
        .receipts
        .delete_receipt(&created.receipt.id)
        .await
        .unwrap();

    let restored = services
        .budgets
        .get_user_budget("u1", "2024-04")
        .await
        .unwrap();
    let cafes = restored.find_category("Cafes").unwrap();
    assert!(approx(cafes.spent_amount, cafes_before.spent_amount));
    assert_eq!(cafes.transactions, cafes_before.transactions);
    assert_eq!(
        services.rewards.user_points("u1").await.unwrap().available_points,
        20
    );

    assert!(matches!(
        services.receipts.delete_receipt(&created.receipt.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn anonymous_receipt_skips_budget_and_points() {
    let (services, _) = build_services();
    let created = services
        .receipts
        .create_receipt(receipt_request(json!({
            "merchantName": "NTUC FairPrice",
            "totalAmount": "15.40"
        })))
        .await
        .unwrap();
    assert_eq!(created.points_awarded, 0);
    assert!(created.receipt.user_id.is_none());
    assert_eq!(created.receipt.category, "Others");
}

#[tokio::test]
async fn new_category_from_receipt_gets_default_share() {
    let (services, _) = build_services();
    services
        .receipts
        .create_receipt(receipt_request(json!({
            "userId": "u2",
            "totalExpense": 40,
            "category": "Travel",
            "dateOfPurchase": "2024-05-10"
        })))
        .await
        .unwrap();
    let budget = services
        .budgets
        .get_user_budget("u2", "2024-05")
        .await
        .unwrap();
    let travel = budget.find_category("Travel").unwrap();
    assert!(approx(travel.budget_amount, 75.0));
    assert!(approx(travel.spent_amount, 40.0));
    assert_eq!(travel.transactions, 1);
}

#[tokio::test]
async fn receipt_points_fund_a_voucher_redemption() {
    let (services, repos) = build_services();
    repos
        .rewards
        .insert(&Reward {
            id: "coffee".into(),
            name: "Free Coffee".into(),
            description: "One regular coffee".into(),
            points_cost: 30,
            image_url: None,
            category: VOUCHER_CATEGORY.into(),
            is_available: true,
            quantity: 2,
            merchant_name: Some("Starbucks".into()),
            terms_conditions: None,
            expiry_date: None,
        })
        .await
        .unwrap();

    services
        .receipts
        .create_receipt(receipt_request(json!({
            "userId": "u3",
            "totalExpense": 25.9,
            "category": "Groceries"
        })))
        .await
        .unwrap();
    assert!(matches!(
        services.rewards.redeem_reward("u3", "coffee").await,
        Err(AppError::InsufficientPoints { available: 25, required: 30 })
    ));

    services.rewards.redeem_welcome_bonus("u3").await.unwrap();
    let redemption = services.rewards.redeem_reward("u3", "coffee").await.unwrap();
    assert_eq!(redemption.points_spent, 30);

    let points = services.rewards.user_points("u3").await.unwrap();
    assert_eq!(points.available_points, 95);
    assert_eq!(points.total_points - points.spent_points, points.available_points);

    // 流水之和等于可用积分
    let ledger = services.rewards.transactions("u3", None).await.unwrap();
    let balance: i64 = ledger
        .iter()
        .map(|t| match t.transaction_type {
            TransactionType::Earned => t.points,
            TransactionType::Spent => -t.points,
        })
        .sum();
    assert_eq!(balance, points.available_points);
}
