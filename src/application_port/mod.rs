mod lock;
mod token_service;

pub use lock::*;
pub use token_service::*;
