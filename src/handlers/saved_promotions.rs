use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::SavedPromotionService;

#[utoipa::path(
    post,
    path = "/api/promotions/saved/{user_id}/{promotion_id}",
    tag = "saved-promotions",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("promotion_id" = String, Path, description = "Promotion id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion saved (idempotent)", body = SavedPromotion),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn save_promotion(
    saved_service: web::Data<SavedPromotionService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, promotion_id) = path.into_inner();
    log::info!("User {user_id} saving promotion {promotion_id}");
    match saved_service.save(&user_id, &promotion_id).await {
        Ok(saved) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": saved
        }))),
        Err(e) => {
            log::error!("User {user_id} failed to save promotion {promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/promotions/saved/{user_id}/{promotion_id}",
    tag = "saved-promotions",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("promotion_id" = String, Path, description = "Promotion id")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Promotion removed from saved list"))
)]
pub async fn unsave_promotion(
    saved_service: web::Data<SavedPromotionService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, promotion_id) = path.into_inner();
    log::info!("User {user_id} removing saved promotion {promotion_id}");
    match saved_service.unsave(&user_id, &promotion_id).await {
        Ok(removed) => {
            let message = if removed {
                "Promotion removed successfully"
            } else {
                "Promotion was not saved, nothing to remove"
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": message
            })))
        }
        Err(e) => {
            log::error!("User {user_id} failed to remove promotion {promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/promotions/saved/{user_id}/{promotion_id}",
    tag = "saved-promotions",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("promotion_id" = String, Path, description = "Promotion id")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Whether the user saved the promotion", body = SavedStatusResponse))
)]
pub async fn is_promotion_saved(
    saved_service: web::Data<SavedPromotionService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, promotion_id) = path.into_inner();
    match saved_service.is_saved(&user_id, &promotion_id).await {
        Ok(saved) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SavedStatusResponse { saved }
        }))),
        Err(e) => {
            log::error!("Failed to check saved promotion {user_id}/{promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/promotions/saved/count/{promotion_id}",
    tag = "saved-promotions",
    params(("promotion_id" = String, Path, description = "Promotion id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Number of users who saved the promotion", body = CountResponse))
)]
pub async fn saved_count(
    saved_service: web::Data<SavedPromotionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let promotion_id = path.into_inner();
    match saved_service.save_count(&promotion_id).await {
        Ok(count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CountResponse { count }
        }))),
        Err(e) => {
            log::error!("Failed to count saves of promotion {promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/promotions/saved/{user_id}",
    tag = "saved-promotions",
    params(("user_id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Saved promotions, newest first, with savedAt", body = [Promotion]))
)]
pub async fn list_saved_promotions(
    saved_service: web::Data<SavedPromotionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match saved_service.list_by_user(&user_id).await {
        Ok(list) => {
            log::info!("User {user_id} has {} saved promotions", list.len());
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": list
            })))
        }
        Err(e) => {
            log::error!("Failed to list saved promotions for user {user_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/promotions/saved/{user_id}/category/{category}",
    tag = "saved-promotions",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("category" = String, Path, description = "Category, case-insensitive")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Saved promotions in the category", body = [Promotion]))
)]
pub async fn list_saved_by_category(
    saved_service: web::Data<SavedPromotionService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, category) = path.into_inner();
    match saved_service
        .list_by_user_and_category(&user_id, &category)
        .await
    {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => {
            log::error!("Failed to list saved {category} promotions for user {user_id}: {e}");
            Ok(e.error_response())
        }
    }
}

/// 挂在 /promotions 作用域下
pub fn saved_promotions_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/saved/count/{promotion_id}", web::get().to(saved_count))
        .route("/saved/{user_id}", web::get().to(list_saved_promotions))
        .route(
            "/saved/{user_id}/category/{category}",
            web::get().to(list_saved_by_category),
        )
        .route(
            "/saved/{user_id}/{promotion_id}",
            web::get().to(is_promotion_saved),
        )
        .route("/saved/{user_id}/{promotion_id}", web::post().to(save_promotion))
        .route(
            "/saved/{user_id}/{promotion_id}",
            web::delete().to(unsave_promotion),
        );
}
