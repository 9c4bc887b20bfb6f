use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::google_credentials::{AccessTokenProvider, load_service_account};
use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};

const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";

/// OCR 端口：输入预处理后的 PNG，返回识别出的全文
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn detect_text(&self, png: &[u8]) -> AppResult<String>;
}

#[derive(Clone)]
enum VisionAuth {
    ApiKey(String),
    ServiceAccount(AccessTokenProvider),
}

/// Google Cloud Vision `images:annotate` REST 客户端
#[derive(Clone)]
pub struct GoogleVisionClient {
    http: Client,
    endpoint: String,
    auth: Option<VisionAuth>,
}

impl GoogleVisionClient {
    /// API key 优先，其次服务账号；都未配置时调用会返回错误
    pub fn from_config(cfg: &GoogleConfig, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("paperworth-backend/vision")
            .timeout(timeout)
            .build()?;

        let auth = match (&cfg.vision_api_key, &cfg.vision_credentials) {
            (Some(key), _) if !key.trim().is_empty() => Some(VisionAuth::ApiKey(key.trim().to_string())),
            (_, Some(raw)) if !raw.trim().is_empty() => {
                let key = load_service_account(raw)?;
                Some(VisionAuth::ServiceAccount(AccessTokenProvider::new(
                    http.clone(),
                    key,
                    VISION_SCOPE,
                )))
            }
            _ => {
                log::warn!("Google Vision credentials not configured, OCR scans will fail");
                None
            }
        };

        Ok(Self {
            http,
            endpoint: cfg.vision_endpoint.clone(),
            auth,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    error: Option<ProviderStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ProviderStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderStatus,
}

#[async_trait]
impl OcrProvider for GoogleVisionClient {
    async fn detect_text(&self, png: &[u8]) -> AppResult<String> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| AppError::ExternalApiError("OCR provider is not configured".into()))?;

        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(png) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let mut req = self.http.post(&self.endpoint).json(&body);
        req = match auth {
            VisionAuth::ApiKey(key) => req.query(&[("key", key.as_str())]),
            VisionAuth::ServiceAccount(provider) => req.bearer_auth(provider.access_token().await?),
        };

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AppError::ExternalApiError(format!(
                "Vision API HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let parsed: AnnotateResponse = resp.json().await?;
        let mut full_text = String::new();
        for res in parsed.responses {
            if let Some(err) = res.error {
                return Err(AppError::ExternalApiError(err.message));
            }
            // 第一条标注是整张图的全文
            if let Some(first) = res.text_annotations.into_iter().next() {
                full_text.push_str(&first.description);
            }
        }
        Ok(full_text)
    }
}
