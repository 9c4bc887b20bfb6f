use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ExtractedItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

/// OCR 识别结果，原样返回给客户端确认，不落库
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedReceipt {
    pub full_text: String,
    pub merchant_name: String,
    pub total_amount: f64,
    pub date: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ExtractedItem>>,
}
