//! # jobhub-core
//!
//! Core crate for JobHub. Contains the storage contract, configuration
//! schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other JobHub crates
//! besides the entity definitions.

pub mod batch;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
