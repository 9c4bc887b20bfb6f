use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::saved_promotions::saved_promotions_config;
use crate::error::AppResult;
use crate::models::*;
use crate::services::PromotionService;

fn list_response(result: AppResult<Vec<Promotion>>, what: &str) -> HttpResponse {
    match result {
        Ok(list) => {
            log::info!("Promotion query {what} returned {} results", list.len());
            HttpResponse::Ok().json(json!({
                "success": true,
                "data": list
            }))
        }
        Err(e) => {
            log::error!("Promotion query {what} failed: {e}");
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/promotions",
    tag = "promotions",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All promotions", body = [Promotion]))
)]
pub async fn list_promotions(promotion_service: web::Data<PromotionService>) -> Result<HttpResponse> {
    Ok(list_response(promotion_service.list_all().await, "all"))
}

#[utoipa::path(
    get,
    path = "/api/promotions/{id}",
    tag = "promotions",
    params(("id" = String, Path, description = "Promotion id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion", body = Promotion),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn get_promotion(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let promotion_id = path.into_inner();
    match promotion_service.get_by_id(&promotion_id).await {
        Ok(promotion) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promotion
        }))),
        Err(e) => {
            log::warn!("Failed to load promotion {promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/promotions/id/{promotion_id}",
    tag = "promotions",
    params(("promotion_id" = i32, Path, description = "Numeric external promotion id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion", body = Promotion),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn get_by_promotion_id(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let promotion_id = path.into_inner();
    match promotion_service.get_by_promotion_id(promotion_id).await {
        Ok(promotion) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promotion
        }))),
        Err(e) => {
            log::warn!("Failed to load promotion #{promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/promotions/category/{category}",
    tag = "promotions",
    params(("category" = String, Path, description = "Category, case-insensitive")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Promotions in the category", body = [Promotion]))
)]
pub async fn promotions_by_category(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let category = path.into_inner();
    Ok(list_response(
        promotion_service.by_category(&category).await,
        &format!("category={category}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/promotions/merchant/{merchant}",
    tag = "promotions",
    params(("merchant" = String, Path, description = "Merchant name substring")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Promotions of matching merchants", body = [Promotion]))
)]
pub async fn promotions_by_merchant(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let merchant = path.into_inner();
    Ok(list_response(
        promotion_service.by_merchant(&merchant).await,
        &format!("merchant={merchant}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/promotions/match",
    tag = "promotions",
    params(
        ("merchant" = Option<String>, Query, description = "Merchant or description substring"),
        ("category" = Option<String>, Query, description = "Exact category")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Union of merchant and category matches", body = [Promotion]))
)]
pub async fn match_promotions(
    promotion_service: web::Data<PromotionService>,
    query: web::Query<MatchQuery>,
) -> Result<HttpResponse> {
    let MatchQuery { merchant, category } = query.into_inner();
    Ok(list_response(
        promotion_service
            .match_promotions(merchant.as_deref(), category.as_deref())
            .await,
        &format!("match merchant={merchant:?} category={category:?}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/promotions/receipt/{receipt_id}",
    tag = "promotions",
    params(("receipt_id" = String, Path, description = "Receipt id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotions relevant to the receipt", body = [Promotion]),
        (status = 404, description = "Receipt not found")
    )
)]
pub async fn promotions_for_receipt(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let receipt_id = path.into_inner();
    Ok(list_response(
        promotion_service.for_receipt(&receipt_id).await,
        &format!("receipt={receipt_id}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/promotions/search",
    tag = "promotions",
    params(("query" = String, Query, description = "Merchant or description substring")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Matching promotions", body = [Promotion]),
        (status = 400, description = "Empty query")
    )
)]
pub async fn search_promotions(
    promotion_service: web::Data<PromotionService>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let text = query.into_inner().query;
    Ok(list_response(
        promotion_service.search(&text).await,
        &format!("search={text}"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/promotions/active",
    tag = "promotions",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Promotions that have not expired", body = [Promotion]))
)]
pub async fn active_promotions(
    promotion_service: web::Data<PromotionService>,
) -> Result<HttpResponse> {
    Ok(list_response(promotion_service.active().await, "active"))
}

#[utoipa::path(
    post,
    path = "/api/promotions",
    tag = "promotions",
    request_body = PromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Promotion created", body = Promotion),
        (status = 400, description = "Invalid promotion")
    )
)]
pub async fn create_promotion(
    promotion_service: web::Data<PromotionService>,
    request: web::Json<PromotionRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    log::info!("Creating promotion for merchant {}", request.merchant);
    match promotion_service.create(request).await {
        Ok(promotion) => {
            log::info!("Promotion {} created", promotion.id);
            Ok(HttpResponse::Created().json(json!({
                "success": true,
                "data": promotion
            })))
        }
        Err(e) => {
            log::error!("Failed to create promotion: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/promotions/{id}",
    tag = "promotions",
    request_body = PromotionRequest,
    params(("id" = String, Path, description = "Promotion id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion updated", body = Promotion),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn update_promotion(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<String>,
    request: web::Json<PromotionRequest>,
) -> Result<HttpResponse> {
    let promotion_id = path.into_inner();
    log::info!("Updating promotion {promotion_id}");
    match promotion_service
        .update(&promotion_id, request.into_inner())
        .await
    {
        Ok(promotion) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promotion
        }))),
        Err(e) => {
            log::error!("Failed to update promotion {promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/promotions/{id}",
    tag = "promotions",
    params(("id" = String, Path, description = "Promotion id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Promotion deleted"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn delete_promotion(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let promotion_id = path.into_inner();
    log::info!("Deleting promotion {promotion_id}");
    match promotion_service.delete(&promotion_id).await {
        Ok(()) => {
            log::info!("Promotion {promotion_id} deleted");
            Ok(HttpResponse::NoContent().finish())
        }
        Err(e) => {
            log::error!("Failed to delete promotion {promotion_id}: {e}");
            Ok(e.error_response())
        }
    }
}

pub fn promotions_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/promotions")
            // 收藏路由需在 /{id} 之前注册
            .configure(saved_promotions_config)
            .route("", web::get().to(list_promotions))
            .route("", web::post().to(create_promotion))
            .route("/category/{category}", web::get().to(promotions_by_category))
            .route("/merchant/{merchant}", web::get().to(promotions_by_merchant))
            .route("/match", web::get().to(match_promotions))
            .route("/receipt/{receipt_id}", web::get().to(promotions_for_receipt))
            .route("/search", web::get().to(search_promotions))
            .route("/active", web::get().to(active_promotions))
            .route("/id/{promotion_id}", web::get().to(get_by_promotion_id))
            .route("/{id}", web::get().to(get_promotion))
            .route("/{id}", web::put().to(update_promotion))
            .route("/{id}", web::delete().to(delete_promotion)),
    );
}
