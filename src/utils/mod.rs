pub mod code_generator;
pub mod date_parser;
pub mod password;

pub use code_generator::{generate_id, generate_redemption_code};
pub use date_parser::*;
pub use password::*;
