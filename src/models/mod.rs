pub mod budget;
pub mod ocr;
pub mod promotion;
pub mod receipt;
pub mod rewards;
pub mod user;

pub use budget::*;
pub use ocr::*;
pub use promotion::*;
pub use receipt::*;
pub use rewards::*;
pub use user::*;
