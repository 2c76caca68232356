pub mod consts;
pub mod db;
mod helpers;

mod attempts;
pub use attempts::*;
mod lockout;
pub use lockout::*;
mod providers;
pub use providers::*;
mod services;
pub use services::*;
mod sessions;
pub use sessions::*;
mod tickets;
pub use tickets::*;

#[cfg(test)]
mod test_support;
