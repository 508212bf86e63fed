//! # jobhub-client
//!
//! The submission API for JobHub: enqueue, schedule, continuation, batch,
//! and recurring-job registration against any [`JobStorage`] backend.
//!
//! [`JobStorage`]: jobhub_core::traits::JobStorage

pub mod client;

pub use client::JobClient;
