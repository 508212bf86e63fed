//! # jobhub-cron
//!
//! Five-field cron expression support for JobHub: parse an expression into
//! a [`CronSchedule`], test instants against it, and search for the next
//! matching occurrence.

pub mod error;
pub mod schedule;

pub use error::CronError;
pub use schedule::CronSchedule;
