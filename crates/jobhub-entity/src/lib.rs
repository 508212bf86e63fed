//! # jobhub-entity
//!
//! Domain entity models for JobHub. Every struct in this crate represents
//! a persisted row or a domain value object. All entities derive `Debug`,
//! `Clone`, `Serialize`, and `Deserialize`.

pub mod job;
pub mod recurring;

pub use job::{Job, JobState};
pub use recurring::RecurringJob;
