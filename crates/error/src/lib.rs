//! Shared error handling for recoverable errors across the finchdb crates.
mod error;
mod macros;

pub use error::{Error, Result};
#[allow(unused_imports)]
pub use macros::*;
