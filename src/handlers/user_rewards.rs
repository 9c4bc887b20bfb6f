use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::RewardsService;

/// recent / expiring 默认天数
const DEFAULT_DAYS: i64 = 30;

fn list_response(result: AppResult<Vec<UserReward>>, user_id: &str) -> HttpResponse {
    match result {
        Ok(list) => HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        })),
        Err(e) => {
            log::error!("Failed to read redemptions for user {user_id}: {e}");
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user-rewards/{user_id}",
    tag = "user-rewards",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Redemptions, newest first", body = [UserReward]))
)]
pub async fn list_user_rewards(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    Ok(list_response(
        rewards_service.redemption_history(&user_id).await,
        &user_id,
    ))
}

#[utoipa::path(
    get,
    path = "/api/user-rewards/{user_id}/status/{status}",
    tag = "user-rewards",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("status" = String, Path, description = "PENDING, FULFILLED or CANCELLED")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Redemptions with the status", body = [UserReward]),
        (status = 400, description = "Unknown status")
    )
)]
pub async fn user_rewards_by_status(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, raw_status) = path.into_inner();
    let status = match raw_status.parse::<RedemptionStatus>() {
        Ok(s) => s,
        Err(msg) => return Ok(AppError::ValidationError(msg).error_response()),
    };
    Ok(list_response(
        rewards_service.redemptions_by_status(&user_id, status).await,
        &user_id,
    ))
}

#[utoipa::path(
    get,
    path = "/api/user-rewards/{user_id}/recent",
    tag = "user-rewards",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("days" = Option<i64>, Query, description = "Look-back window, default 30")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Redemptions within the window", body = [UserReward]))
)]
pub async fn recent_user_rewards(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
    query: web::Query<DaysQuery>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let days = query.days.unwrap_or(DEFAULT_DAYS);
    Ok(list_response(
        rewards_service.recent_redemptions(&user_id, days).await,
        &user_id,
    ))
}

#[utoipa::path(
    get,
    path = "/api/user-rewards/{user_id}/expiring",
    tag = "user-rewards",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("days" = Option<i64>, Query, description = "Look-ahead window, default 30")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Fulfilled rewards expiring within the window", body = [UserReward]))
)]
pub async fn expiring_user_rewards(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
    query: web::Query<DaysQuery>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let days = query.days.unwrap_or(DEFAULT_DAYS);
    Ok(list_response(
        rewards_service.expiring_redemptions(&user_id, days).await,
        &user_id,
    ))
}

pub fn user_rewards_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user-rewards")
            .route("/{user_id}", web::get().to(list_user_rewards))
            .route("/{user_id}/status/{status}", web::get().to(user_rewards_by_status))
            .route("/{user_id}/recent", web::get().to(recent_user_rewards))
            .route("/{user_id}/expiring", web::get().to(expiring_user_rewards)),
    );
}
