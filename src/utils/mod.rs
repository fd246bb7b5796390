//! Shared helpers

pub mod error;
pub mod paths;

pub use error::{AppError, ErrorResponse};
