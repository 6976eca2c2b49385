mod config;
mod constants;
mod control_plane;
mod database;
mod errors;
mod health;
mod observer;
mod process;
mod runtime;
pub mod utils;

pub use config::*;
pub use control_plane::*;
pub use database::*;
pub use errors::*;
pub use health::*;
pub use observer::*;
pub use process::*;
pub use runtime::*;
pub use utils::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
