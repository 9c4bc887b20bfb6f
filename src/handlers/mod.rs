pub mod budgets;
pub mod ocr;
pub mod promotions;
pub mod receipts;
pub mod rewards;
pub mod saved_promotions;
pub mod user_points;
pub mod user_rewards;
pub mod users;

pub use budgets::budgets_config;
pub use ocr::ocr_config;
pub use promotions::promotions_config;
pub use receipts::receipts_config;
pub use rewards::rewards_config;
pub use user_points::user_points_config;
pub use user_rewards::user_rewards_config;
pub use users::users_config;
