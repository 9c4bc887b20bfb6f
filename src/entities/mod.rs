pub mod budgets;
pub mod point_transactions;
pub mod promotions;
pub mod receipts;
pub mod rewards;
pub mod saved_promotions;
pub mod user_points;
pub mod user_rewards;
pub mod users;

pub use budgets as budget_entity;
pub use point_transactions as point_transaction_entity;
pub use promotions as promotion_entity;
pub use receipts as receipt_entity;
pub use rewards as reward_entity;
pub use saved_promotions as saved_promotion_entity;
pub use user_points as user_points_entity;
pub use user_rewards as user_reward_entity;
pub use users as user_entity;
