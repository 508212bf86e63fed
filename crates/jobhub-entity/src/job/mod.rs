//! Background job domain entities.

pub mod model;
pub mod state;

pub use model::Job;
pub use state::JobState;
