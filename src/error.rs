use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient points: available {available}, required {required}")]
    InsufficientPoints { available: i64, required: i64 },

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 唯一约束冲突映射为 Conflict，其余保持数据库错误
    pub fn from_insert(err: sea_orm::DbErr, what: &str) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict(format!("{what} already exists"))
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheError(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::ImageError(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout("Operation deadline exceeded".to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::ImageError(msg) => {
                log::warn!("Image error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "INVALID_IMAGE",
                    msg.clone(),
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Forbidden".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                log::warn!("Conflict: {msg}");
                (actix_web::http::StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::InsufficientPoints { .. } => {
                log::warn!("{self}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "INSUFFICIENT_POINTS",
                    "Not enough points to redeem this reward".to_string(),
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg.clone(),
                )
            }
            AppError::Timeout(msg) => {
                log::error!("Timeout: {msg}");
                (
                    actix_web::http::StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    msg.clone(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::ValidationError("x".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AuthError("x".into()).error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("x".into()).error_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).error_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InsufficientPoints {
                available: 1,
                required: 2
            }
            .error_response()
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InternalError("x".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_custom_db_error_is_not_conflict() {
        let err = AppError::from_insert(sea_orm::DbErr::Custom("boom".into()), "Budget");
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
