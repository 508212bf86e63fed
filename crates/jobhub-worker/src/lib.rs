//! Background job processing for JobHub.
//!
//! This crate provides:
//! - A job processor that polls for due jobs and executes them on a bounded
//!   worker pool
//! - A recurring loop that materializes job instances from cron schedules
//! - A handler registry that dispatches jobs to the correct handler
//! - A typed handler adapter that owns payload deserialization

pub mod executor;
pub mod handler;
pub mod outcome;
pub mod processor;
pub mod recurring;

pub use executor::{HandlerRegistry, JobHandler};
pub use handler::{PayloadHandler, TypedHandler};
pub use outcome::JobOutcome;
pub use processor::JobProcessor;
