//! Core infrastructure: fundamental types, constants, error handling, and
//! small shared utilities.

pub mod constants;
pub mod error;
pub mod types;
pub mod utils;
