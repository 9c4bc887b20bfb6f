use actix_web::{HttpResponse, ResponseError, Result, web};
use serde::Serialize;
use serde_json::json;

use crate::error::AppResult;
use crate::models::*;
use crate::services::RewardsService;

fn data_response<T: Serialize>(result: AppResult<T>, what: &str) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(json!({
            "success": true,
            "data": data
        })),
        Err(e) => {
            log::error!("Rewards request {what} failed: {e}");
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/rewards/available",
    tag = "rewards",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Rewards in stock", body = [Reward]))
)]
pub async fn available_rewards(rewards_service: web::Data<RewardsService>) -> Result<HttpResponse> {
    Ok(data_response(
        rewards_service.available_rewards().await,
        "available",
    ))
}

#[utoipa::path(
    get,
    path = "/api/rewards/category/{category}",
    tag = "rewards",
    params(("category" = String, Path, description = "Reward category, case-insensitive")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Rewards in the category", body = [Reward]))
)]
pub async fn rewards_by_category(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let category = path.into_inner();
    Ok(data_response(
        rewards_service.rewards_by_category(&category).await,
        &format!("category={category}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/rewards/affordable/{user_id}",
    tag = "rewards",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Rewards the user can afford", body = [Reward]))
)]
pub async fn affordable_rewards(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    Ok(data_response(
        rewards_service.affordable_rewards(&user_id).await,
        &format!("affordable user={user_id}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/rewards/points/{user_id}",
    tag = "rewards",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Points account, created empty when absent", body = UserPoints))
)]
pub async fn user_points(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    Ok(data_response(
        rewards_service.user_points(&user_id).await,
        &format!("points user={user_id}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/rewards/history/{user_id}",
    tag = "rewards",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Redemptions, newest first", body = [UserReward]))
)]
pub async fn redemption_history(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    Ok(data_response(
        rewards_service.redemption_history(&user_id).await,
        &format!("history user={user_id}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/rewards/transactions/{user_id}",
    tag = "rewards",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("days" = Option<i64>, Query, description = "Only the last N days")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Point ledger, newest first", body = [PointTransaction]))
)]
pub async fn transactions(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
    query: web::Query<DaysQuery>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    Ok(data_response(
        rewards_service.transactions(&user_id, query.days).await,
        &format!("transactions user={user_id}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/rewards/{id}",
    tag = "rewards",
    params(("id" = String, Path, description = "Reward id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reward", body = Reward),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn get_reward(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let reward_id = path.into_inner();
    Ok(data_response(
        rewards_service.reward_by_id(&reward_id).await,
        &format!("reward={reward_id}"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/rewards/award-points/{receipt_id}",
    tag = "rewards",
    params(("receipt_id" = String, Path, description = "Receipt id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Points awarded", body = PointTransaction),
        (status = 404, description = "Receipt not found"),
        (status = 409, description = "Points already awarded for the receipt")
    )
)]
pub async fn award_points(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let receipt_id = path.into_inner();
    log::info!("Awarding points for receipt {receipt_id}");
    match rewards_service.award_points_for_receipt(&receipt_id).await {
        Ok(tx) => {
            log::info!(
                "Awarded {} points to user {} for receipt {receipt_id}",
                tx.points,
                tx.user_id
            );
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": tx
            })))
        }
        Err(e) => {
            log::error!("Failed to award points for receipt {receipt_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/rewards/redeem/{user_id}/{reward_id}",
    tag = "rewards",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("reward_id" = String, Path, description = "Reward id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reward redeemed", body = UserReward),
        (status = 404, description = "Reward not found"),
        (status = 409, description = "Reward unavailable or insufficient points")
    )
)]
pub async fn redeem_reward(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, reward_id) = path.into_inner();
    log::info!("User {user_id} redeeming reward {reward_id}");
    match rewards_service.redeem_reward(&user_id, &reward_id).await {
        Ok(redemption) => {
            log::info!(
                "User {user_id} redeemed reward {reward_id}, redemption {}",
                redemption.id
            );
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": redemption
            })))
        }
        Err(e) => {
            log::warn!("User {user_id} failed to redeem reward {reward_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/rewards/welcome-bonus/{user_id}",
    tag = "rewards",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Welcome bonus credited", body = WelcomeBonusResponse),
        (status = 409, description = "Welcome bonus already claimed")
    )
)]
pub async fn welcome_bonus(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    log::info!("User {user_id} claiming welcome bonus");
    match rewards_service.redeem_welcome_bonus(&user_id).await {
        Ok(bonus) => {
            log::info!("Welcome bonus credited to user {user_id}");
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": bonus
            })))
        }
        Err(e) => {
            log::warn!("Welcome bonus for user {user_id} rejected: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/rewards/admin/add",
    tag = "rewards-admin",
    request_body = RewardRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Reward created", body = Reward),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn add_reward(
    rewards_service: web::Data<RewardsService>,
    request: web::Json<RewardRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    log::info!("Adding reward {}", request.name);
    match rewards_service.add_reward(request).await {
        Ok(reward) => {
            log::info!("Reward {} added", reward.id);
            Ok(HttpResponse::Created().json(json!({
                "success": true,
                "data": reward
            })))
        }
        Err(e) => {
            log::error!("Failed to add reward: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/rewards/admin/{id}",
    tag = "rewards-admin",
    request_body = RewardRequest,
    params(("id" = String, Path, description = "Reward id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reward updated", body = Reward),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn update_reward(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
    request: web::Json<RewardRequest>,
) -> Result<HttpResponse> {
    let reward_id = path.into_inner();
    log::info!("Updating reward {reward_id}");
    Ok(data_response(
        rewards_service
            .update_reward(&reward_id, request.into_inner())
            .await,
        &format!("update reward={reward_id}"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/rewards/admin/{id}",
    tag = "rewards-admin",
    params(("id" = String, Path, description = "Reward id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reward deleted"),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn delete_reward(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let reward_id = path.into_inner();
    log::info!("Deleting reward {reward_id}");
    match rewards_service.delete_reward(&reward_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Reward deleted successfully"
        }))),
        Err(e) => {
            log::error!("Failed to delete reward {reward_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/rewards/admin/low-stock",
    tag = "rewards-admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Available rewards with five or fewer units left", body = [Reward]))
)]
pub async fn low_stock_rewards(rewards_service: web::Data<RewardsService>) -> Result<HttpResponse> {
    Ok(data_response(
        rewards_service.low_stock_rewards().await,
        "low-stock",
    ))
}

#[utoipa::path(
    put,
    path = "/api/rewards/admin/redemption/{id}",
    tag = "rewards-admin",
    request_body = StatusUpdateRequest,
    params(("id" = String, Path, description = "Redemption id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status updated", body = UserReward),
        (status = 404, description = "Redemption not found")
    )
)]
pub async fn update_redemption_status(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
    request: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse> {
    let redemption_id = path.into_inner();
    let status = request.status;
    log::info!("Setting redemption {redemption_id} to {status}");
    Ok(data_response(
        rewards_service
            .update_redemption_status(&redemption_id, status)
            .await,
        &format!("status redemption={redemption_id}"),
    ))
}

#[utoipa::path(
    put,
    path = "/api/rewards/admin/redemption/{id}/delivery",
    tag = "rewards-admin",
    request_body = DeliveryInfoRequest,
    params(("id" = String, Path, description = "Redemption id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Delivery info recorded", body = UserReward),
        (status = 404, description = "Redemption not found")
    )
)]
pub async fn add_delivery_info(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
    request: web::Json<DeliveryInfoRequest>,
) -> Result<HttpResponse> {
    let redemption_id = path.into_inner();
    log::info!("Recording delivery info for redemption {redemption_id}");
    Ok(data_response(
        rewards_service
            .add_delivery_info(&redemption_id, request.into_inner().delivery_info)
            .await,
        &format!("delivery redemption={redemption_id}"),
    ))
}

pub fn rewards_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rewards")
            .route("/available", web::get().to(available_rewards))
            .route("/category/{category}", web::get().to(rewards_by_category))
            .route("/affordable/{user_id}", web::get().to(affordable_rewards))
            .route("/points/{user_id}", web::get().to(user_points))
            .route("/history/{user_id}", web::get().to(redemption_history))
            .route("/transactions/{user_id}", web::get().to(transactions))
            .route("/award-points/{receipt_id}", web::post().to(award_points))
            .route("/redeem/{user_id}/{reward_id}", web::post().to(redeem_reward))
            .route("/welcome-bonus/{user_id}", web::post().to(welcome_bonus))
            .route("/admin/add", web::post().to(add_reward))
            .route("/admin/low-stock", web::get().to(low_stock_rewards))
            .route(
                "/admin/redemption/{id}",
                web::put().to(update_redemption_status),
            )
            .route(
                "/admin/redemption/{id}/delivery",
                web::put().to(add_delivery_info),
            )
            .route("/admin/{id}", web::put().to(update_reward))
            .route("/admin/{id}", web::delete().to(delete_reward))
            .route("/{id}", web::get().to(get_reward)),
    );
}
