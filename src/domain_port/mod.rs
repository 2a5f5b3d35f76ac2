// store

mod kv_store;

pub use kv_store::*;

// codec

mod token_codec;

pub use token_codec::*;
