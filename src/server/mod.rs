mod lifecycle;
mod listener;
mod server;
mod termination;

pub use lifecycle::*;
pub use listener::*;
pub use server::*;
pub use termination::*;
