use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::error::AppError;
use crate::models::*;
use crate::services::RewardsService;

fn ledger_response(result: crate::error::AppResult<Vec<PointTransaction>>, user_id: &str) -> HttpResponse {
    match result {
        Ok(list) => HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        })),
        Err(e) => {
            log::error!("Failed to read point ledger for user {user_id}: {e}");
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user-points/{user_id}",
    tag = "user-points",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Points account", body = UserPoints),
        (status = 404, description = "User has no points record")
    )
)]
pub async fn get_user_points(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match rewards_service.find_user_points(&user_id).await {
        Ok(points) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": points
        }))),
        Err(e) => {
            log::warn!("Failed to load points for user {user_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user-points/{user_id}/transactions",
    tag = "user-points",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Point ledger, newest first", body = [PointTransaction]))
)]
pub async fn get_transactions(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    Ok(ledger_response(
        rewards_service.transactions(&user_id, None).await,
        &user_id,
    ))
}

#[utoipa::path(
    get,
    path = "/api/user-points/{user_id}/transactions/type/{transaction_type}",
    tag = "user-points",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("transaction_type" = String, Path, description = "EARNED or SPENT")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ledger entries of the type", body = [PointTransaction]),
        (status = 400, description = "Unknown transaction type")
    )
)]
pub async fn get_transactions_by_type(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, raw_type) = path.into_inner();
    let transaction_type = match raw_type.parse::<TransactionType>() {
        Ok(t) => t,
        Err(msg) => return Ok(AppError::ValidationError(msg).error_response()),
    };
    Ok(ledger_response(
        rewards_service
            .transactions_by_type(&user_id, transaction_type)
            .await,
        &user_id,
    ))
}

#[utoipa::path(
    get,
    path = "/api/user-points/{user_id}/transactions/source/{source}",
    tag = "user-points",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("source" = String, Path, description = "RECEIPT_SCAN, REWARD_REDEMPTION, WELCOME_BONUS or ROLLBACK_REDEMPTION")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ledger entries from the source", body = [PointTransaction]),
        (status = 400, description = "Unknown source")
    )
)]
pub async fn get_transactions_by_source(
    rewards_service: web::Data<RewardsService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, raw_source) = path.into_inner();
    let source = match raw_source.parse::<PointSource>() {
        Ok(s) => s,
        Err(msg) => return Ok(AppError::ValidationError(msg).error_response()),
    };
    Ok(ledger_response(
        rewards_service.transactions_by_source(&user_id, source).await,
        &user_id,
    ))
}

pub fn user_points_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user-points")
            .route("/{user_id}", web::get().to(get_user_points))
            .route("/{user_id}/transactions", web::get().to(get_transactions))
            .route(
                "/{user_id}/transactions/type/{transaction_type}",
                web::get().to(get_transactions_by_type),
            )
            .route(
                "/{user_id}/transactions/source/{source}",
                web::get().to(get_transactions_by_source),
            ),
    );
}
