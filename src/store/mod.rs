// In-memory stream store

mod errors;
mod group;
mod server;
mod stream;

pub use errors::*;
pub use group::*;
pub use server::*;
pub use stream::*;
