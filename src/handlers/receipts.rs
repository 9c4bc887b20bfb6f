use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::ReceiptService;

#[utoipa::path(
    post,
    path = "/api/receipts",
    tag = "receipts",
    request_body = CreateReceiptRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Receipt saved, budget and points updated", body = CreateReceiptResponse),
        (status = 400, description = "Malformed amount")
    )
)]
pub async fn create_receipt(
    receipt_service: web::Data<ReceiptService>,
    request: web::Json<CreateReceiptRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    let user_id = request.user_id.clone();
    log::info!("Creating receipt for user {user_id:?}");

    match receipt_service.create_receipt(request).await {
        Ok(created) => {
            log::info!(
                "Receipt {} created for user {user_id:?}, {} points awarded",
                created.receipt.id,
                created.points_awarded
            );
            Ok(HttpResponse::Created().json(json!({
                "success": true,
                "data": created
            })))
        }
        Err(e) => {
            log::error!("Failed to create receipt for user {user_id:?}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/receipts/{id}",
    tag = "receipts",
    params(("id" = String, Path, description = "Receipt id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Receipt", body = Receipt),
        (status = 404, description = "Receipt not found")
    )
)]
pub async fn get_receipt(
    receipt_service: web::Data<ReceiptService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let receipt_id = path.into_inner();
    match receipt_service.get_receipt(&receipt_id).await {
        Ok(receipt) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": receipt
        }))),
        Err(e) => {
            log::warn!("Failed to load receipt {receipt_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/receipts/user/{user_id}",
    tag = "receipts",
    params(("user_id" = String, Path, description = "Owner id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Receipts of the user", body = [Receipt])
    )
)]
pub async fn list_user_receipts(
    receipt_service: web::Data<ReceiptService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match receipt_service.list_by_user(&user_id).await {
        Ok(list) => {
            log::info!("Listed {} receipts for user {user_id}", list.len());
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": list
            })))
        }
        Err(e) => {
            log::error!("Failed to list receipts for user {user_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/receipts/user/{user_id}/recent",
    tag = "receipts",
    params(("user_id" = String, Path, description = "Owner id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Receipts ordered by purchase date, newest first", body = [Receipt])
    )
)]
pub async fn recent_user_receipts(
    receipt_service: web::Data<ReceiptService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match receipt_service.recent_by_user(&user_id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => {
            log::error!("Failed to list recent receipts for user {user_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/receipts/user/{user_id}/count",
    tag = "receipts",
    params(("user_id" = String, Path, description = "Owner id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Number of receipts", body = CountResponse)
    )
)]
pub async fn count_user_receipts(
    receipt_service: web::Data<ReceiptService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match receipt_service.count_by_user(&user_id).await {
        Ok(count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CountResponse { count }
        }))),
        Err(e) => {
            log::error!("Failed to count receipts for user {user_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/receipts/{id}",
    tag = "receipts",
    params(("id" = String, Path, description = "Receipt id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Receipt deleted and budget restored"),
        (status = 404, description = "Receipt not found")
    )
)]
pub async fn delete_receipt(
    receipt_service: web::Data<ReceiptService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let receipt_id = path.into_inner();
    log::info!("Deleting receipt {receipt_id}");
    match receipt_service.delete_receipt(&receipt_id).await {
        Ok(()) => {
            log::info!("Receipt {receipt_id} deleted");
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "Receipt deleted successfully"
            })))
        }
        Err(e) => {
            log::error!("Failed to delete receipt {receipt_id}: {e}");
            Ok(e.error_response())
        }
    }
}

pub fn receipts_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/receipts")
            .route("", web::post().to(create_receipt))
            .route("/user/{user_id}", web::get().to(list_user_receipts))
            .route("/user/{user_id}/recent", web::get().to(recent_user_receipts))
            .route("/user/{user_id}/count", web::get().to(count_user_receipts))
            .route("/{id}", web::get().to(get_receipt))
            .route("/{id}", web::delete().to(delete_receipt)),
    );
}
