use actix_multipart::Multipart;
use actix_web::{HttpResponse, ResponseError, Result, web};
use futures_util::StreamExt;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::OcrService;

/// 上传文件大小上限
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 读取 multipart 中名为 `file` 的字段
async fn read_file_field(mut payload: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {e}")))?;
        if field.name() != Some("file") {
            continue;
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::ValidationError(format!("Failed to read upload: {e}")))?;
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::ValidationError("Uploaded file is too large".into()));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }
    Ok(Vec::new())
}

#[utoipa::path(
    post,
    path = "/api/ocr/scan",
    tag = "ocr",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Receipt image in field `file`"
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Extracted receipt fields", body = ExtractedReceipt),
        (status = 400, description = "Missing or undecodable image"),
        (status = 502, description = "OCR provider failure")
    )
)]
pub async fn scan_receipt(
    ocr_service: web::Data<OcrService>,
    payload: Multipart,
) -> Result<HttpResponse> {
    log::info!("OCR scan requested");
    let result = match read_file_field(payload).await {
        Ok(bytes) => {
            log::info!("OCR upload received, {} bytes", bytes.len());
            ocr_service.scan(&bytes).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(extracted) => {
            log::info!(
                "OCR scan succeeded: merchant {:?}, total {:.2}",
                extracted.merchant_name,
                extracted.total_amount
            );
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": extracted
            })))
        }
        Err(e) => {
            log::error!("OCR scan failed: {e}");
            Ok(e.error_response())
        }
    }
}

pub fn ocr_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/ocr").route("/scan", web::post().to(scan_receipt)));
}
