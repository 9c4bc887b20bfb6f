use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::external::OcrProvider;
use crate::extraction::{extract_fields, imaging};
use crate::models::ExtractedReceipt;

#[derive(Clone)]
pub struct OcrService {
    provider: Arc<dyn OcrProvider>,
}

impl OcrService {
    pub fn new(provider: Arc<dyn OcrProvider>) -> Self {
        Self { provider }
    }

    /// 预处理图片、调用 OCR 并抽取字段，结果不落库
    pub async fn scan(&self, image: &[u8]) -> AppResult<ExtractedReceipt> {
        if image.is_empty() {
            return Err(AppError::ValidationError("Please select a file to upload".into()));
        }

        let bytes = image.to_vec();
        let png = tokio::task::spawn_blocking(move || imaging::preprocess(&bytes))
            .await
            .map_err(|e| AppError::InternalError(format!("Image preprocessing aborted: {e}")))??;

        let text = self.provider.detect_text(&png).await?;
        log::info!("OCR returned {} characters", text.len());
        Ok(extract_fields(&text))
    }
}
