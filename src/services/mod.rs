pub mod auth_service;
pub mod budget_service;
pub mod ocr_service;
pub mod promotion_service;
pub mod receipt_service;
pub mod rewards_service;
pub mod saved_promotion_service;

pub use auth_service::*;
pub use budget_service::*;
pub use ocr_service::*;
pub use promotion_service::*;
pub use receipt_service::*;
pub use rewards_service::*;
pub use saved_promotion_service::*;
