use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::AuthService;

#[utoipa::path(
    post,
    path = "/api/users/firebase-auth",
    tag = "users",
    request_body = FirebaseAuthRequest,
    responses(
        (status = 200, description = "Local user linked or provisioned", body = UserResponse),
        (status = 400, description = "Missing uid, email or idToken"),
        (status = 401, description = "Invalid token or uid mismatch")
    )
)]
pub async fn firebase_auth(
    auth_service: web::Data<AuthService>,
    request: web::Json<FirebaseAuthRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    let uid = request.uid.clone();
    log::info!("Firebase sign-in for uid {uid}");

    match auth_service.firebase_auth(request).await {
        Ok(user) => {
            log::info!("Firebase sign-in succeeded for uid {uid}, user {}", user.id);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": user
            })))
        }
        Err(e) => {
            log::warn!("Firebase sign-in failed for uid {uid}: {e}");
            Ok(e.error_response())
        }
    }
}

pub fn users_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/users").route("/firebase-auth", web::post().to(firebase_auth)));
}
