pub mod allocators;
pub mod config;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use allocators::*;
pub use config::PidRange;
pub use error::{PidError, Result};
