//! Recurring job domain entities.

pub mod model;

pub use model::RecurringJob;
