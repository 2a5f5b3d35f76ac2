mod claims;
mod lock;
mod token;

pub use claims::*;
pub use lock::*;
pub use token::*;
