use bcrypt::{DEFAULT_COST, hash};

use crate::error::{AppError, AppResult};

/// 对密码进行哈希
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))
}

/// 第三方登录用户的占位密码：随机密钥的 bcrypt 哈希，任何输入都无法匹配
pub fn placeholder_password_hash() -> AppResult<String> {
    let secret = format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
    hash_password(&secret)
}
