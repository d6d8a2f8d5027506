// Utils

mod env;
mod query_string;
mod time;
mod urls;

pub use env::*;
pub use query_string::*;
pub use time::*;
pub use urls::*;
