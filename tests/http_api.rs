mod common;

use actix_web::http::StatusCode;
use actix_web::{App, test};
use serde_json::{Value, json};
use std::sync::Arc;

use common::{FakeVerifier, admin_config, build_services};
use paperworth_backend::middlewares::AuthMiddleware;

macro_rules! app {
    ($services:expr) => {{
        let services = $services.clone();
        test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(Arc::new(FakeVerifier), admin_config()))
                .configure(move |cfg| services.configure(cfg)),
        )
        .await
    }};
}

/// 中间件拒绝时返回 Err，统一取出状态码与响应体
macro_rules! send {
    ($app:expr, $req:expr) => {{
        match test::try_call_service(&$app, $req.to_request()).await {
            Ok(resp) => {
                let status = resp.status();
                let body = test::read_body(resp).await;
                let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                (status, json)
            }
            Err(err) => (err.error_response().status(), Value::Null),
        }
    }};
}

fn bearer(uid: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer token-{uid}"))
}

#[actix_web::test]
async fn missing_or_bad_token_is_unauthorized() {
    let (services, _) = build_services();
    let app = app!(services);

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/receipts/user/u1"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/receipts/user/u1")
            .insert_header(("Authorization", "Bearer nonsense"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/receipts/user/u1")
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[actix_web::test]
async fn path_segments_cannot_bypass_authentication() {
    let (services, _) = build_services();
    let app = app!(services);

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/budgets/user/victim/month/2024-03/category/login-hack")
            .set_json(json!({"amount": 9999.0}))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/rewards/welcome-bonus/firebase-auth")
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let budget = services
        .budgets
        .get_user_budget("victim", "2024-03")
        .await
        .unwrap();
    assert!(budget.find_category("login-hack").is_none());
}

#[actix_web::test]
async fn firebase_auth_is_public_and_checks_uid() {
    let (services, _) = build_services();
    let app = app!(services);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/users/firebase-auth")
            .set_json(json!({
                "uid": "u1",
                "email": "u1@example.com",
                "idToken": "token-u1"
            }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("User"));
    assert_eq!(body["data"]["email"], json!("u1@example.com"));

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/users/firebase-auth")
            .set_json(json!({
                "uid": "u1",
                "email": "u1@example.com",
                "idToken": "token-someone-else"
            }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn default_budget_is_created_once() {
    let (services, _) = build_services();
    let app = app!(services);

    let (status, first) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/budgets/user/u1/month/2024-03")
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["totalBudget"], json!(1500.0));
    let groceries = first["data"]["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["category"] == "Groceries")
        .unwrap();
    assert_eq!(groceries["budgetAmount"], json!(450.0));

    let (_, second) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/budgets/user/u1/month/2024-03")
            .insert_header(bearer("u1"))
    );
    assert_eq!(first["data"]["id"], second["data"]["id"]);

    let (_, all) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/budgets/user/u1")
            .insert_header(bearer("u1"))
    );
    assert_eq!(all["data"].as_array().unwrap().len(), 1);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/budgets/user/u1/month/March")
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn welcome_bonus_second_claim_conflicts() {
    let (services, _) = build_services();
    let app = app!(services);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/rewards/welcome-bonus/u1")
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pointsAwarded"], json!(100));

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/rewards/welcome-bonus/u1")
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    let (_, points) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/user-points/u1")
            .insert_header(bearer("u1"))
    );
    assert_eq!(points["data"]["availablePoints"], json!(100));

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/user-points/nobody")
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn admin_routes_require_admin_email() {
    let (services, _) = build_services();
    let app = app!(services);
    let reward = json!({
        "name": "Free Coffee",
        "description": "One regular coffee",
        "pointsCost": 300,
        "category": "VOUCHER",
        "isAvailable": true,
        "quantity": 2
    });

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/rewards/admin/add")
            .insert_header(bearer("u1"))
            .set_json(reward.clone())
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/rewards/admin/add")
            .insert_header(bearer("admin"))
            .set_json(reward)
    );
    assert_eq!(status, StatusCode::CREATED);
    let reward_id = created["data"]["id"].as_str().unwrap().to_string();

    // 仅有 100 积分，不足以兑换
    services.rewards.redeem_welcome_bonus("u1").await.unwrap();
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/rewards/redeem/u1/{reward_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], json!("INSUFFICIENT_POINTS"));

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/rewards/admin/low-stock")
            .insert_header(bearer("admin"))
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn voucher_redemption_over_http() {
    let (services, repos) = build_services();
    let app = app!(services);
    repos.points.credit("u1", 500).await.unwrap();
    services
        .rewards
        .add_reward(
            serde_json::from_value(json!({
                "name": "Cinema Voucher",
                "pointsCost": 300,
                "category": "VOUCHER",
                "isAvailable": true,
                "quantity": 2
            }))
            .unwrap(),
        )
        .await
        .unwrap();
    let reward_id = services.rewards.available_rewards().await.unwrap()[0]
        .id
        .clone();

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/rewards/redeem/u1/{reward_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("FULFILLED"));
    let code = body["data"]["redemptionCode"].as_str().unwrap();
    assert!(regex::Regex::new(r"^PW-[0-9A-F]{8}$").unwrap().is_match(code));

    let (_, points) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/rewards/points/u1")
            .insert_header(bearer("u1"))
    );
    assert_eq!(points["data"]["availablePoints"], json!(200));

    let (_, reward) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/rewards/{reward_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(reward["data"]["quantity"], json!(1));

    let (_, spent) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/user-points/u1/transactions/type/SPENT")
            .insert_header(bearer("u1"))
    );
    assert_eq!(spent["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn promotions_crud_and_saved_list() {
    let (services, _) = build_services();
    let app = app!(services);

    let (status, created) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/promotions")
            .insert_header(bearer("u1"))
            .set_json(json!({
                "merchant": "Starbucks",
                "description": "1-for-1 latte",
                "expiry": "2099-12-31",
                "category": "Cafes",
                "promotionId": 7
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let promotion_id = created["data"]["id"].as_str().unwrap().to_string();

    let (_, by_num) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/promotions/id/7")
            .insert_header(bearer("u1"))
    );
    assert_eq!(by_num["data"]["id"], json!(promotion_id));

    let (_, matched) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/promotions/match?merchant=star&category=CAFES")
            .insert_header(bearer("u1"))
    );
    assert_eq!(matched["data"].as_array().unwrap().len(), 1);

    for _ in 0..2 {
        let (status, _) = send!(
            app,
            test::TestRequest::post()
                .uri(&format!("/api/promotions/saved/u1/{promotion_id}"))
                .insert_header(bearer("u1"))
        );
        assert_eq!(status, StatusCode::OK);
    }
    let (_, count) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/promotions/saved/count/{promotion_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(count["data"]["count"], json!(1));

    let (_, saved) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/promotions/saved/u1")
            .insert_header(bearer("u1"))
    );
    let saved = saved["data"].as_array().unwrap();
    assert_eq!(saved.len(), 1);
    assert!(saved[0]["savedAt"].is_string());

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/promotions/{promotion_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/promotions/{promotion_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn receipt_create_and_delete_over_http() {
    let (services, _) = build_services();
    let app = app!(services);

    let (status, created) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/receipts")
            .insert_header(bearer("u1"))
            .set_json(json!({
                "userId": "u1",
                "merchantName": "Starbucks",
                "totalExpense": 20,
                "category": "Cafes",
                "dateOfPurchase": "03/04/2024"
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["pointsAwarded"], json!(20));
    let receipt_id = created["data"]["receipt"]["id"].as_str().unwrap().to_string();

    let (_, count) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/receipts/user/u1/count")
            .insert_header(bearer("u1"))
    );
    assert_eq!(count["data"]["count"], json!(1));

    let (status, again) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/rewards/award-points/{receipt_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["success"], json!(false));

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/receipts/{receipt_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/receipts/{receipt_id}"))
            .insert_header(bearer("u1"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}
