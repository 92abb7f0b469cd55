//! tidelog Core - Shared types, configuration, and error handling

pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod types;

pub use config::*;
pub use constants::*;
pub use error::{Error, Result};
pub use filter::*;
pub use types::*;
