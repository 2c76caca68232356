mod config;
mod error;
pub mod helpers;
mod types;

pub use config::*;
pub use error::*;
pub use helpers::clock::{Clock, SystemClock};
pub use types::*;
