mod distributed_lock;
mod token_service_impl;

pub use distributed_lock::*;
pub use token_service_impl::*;
