//! sea-orm backed repositories.

mod budgets;
mod points;
mod promotions;
mod receipts;
mod rewards;
mod users;

pub use budgets::PgBudgetRepository;
pub use points::{PgLedgerRepository, PgPointsRepository};
pub use promotions::{PgPromotionRepository, PgSavedPromotionRepository};
pub use receipts::PgReceiptRepository;
pub use rewards::{PgRewardRepository, PgUserRewardRepository};
pub use users::PgUserRepository;

use crate::error::AppError;
use sea_orm::DbErr;

/// LIKE 模式转义，匹配任意位置
pub(crate) fn like_contains(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// update() 未命中任何行时视为不存在
pub(crate) fn map_update_err(err: DbErr, what: &str) -> AppError {
    match err {
        DbErr::RecordNotUpdated => AppError::NotFound(format!("{what} not found")),
        other => AppError::DatabaseError(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_contains_escapes_wildcards() {
        assert_eq!(like_contains("Star"), "%star%");
        assert_eq!(like_contains("50%_off"), "%50\\%\\_off%");
    }
}
