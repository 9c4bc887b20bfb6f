use uuid::Uuid;

/// 兑换码前缀
pub const REDEMPTION_CODE_PREFIX: &str = "PW-";

/// 生成兑换码：PW- 加 8 位大写十六进制
pub fn generate_redemption_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{REDEMPTION_CODE_PREFIX}{}", id[..8].to_uppercase())
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
