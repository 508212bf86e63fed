//! Cron evaluation errors.

use thiserror::Error;

/// Error raised while parsing or evaluating a cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    /// The expression could not be parsed.
    #[error("invalid cron expression: {0}")]
    InvalidExpression(String),

    /// The occurrence search exhausted its four-year bound.
    #[error("no matching occurrence within the next four years")]
    NoOccurrence,
}

impl CronError {
    /// Shorthand for an [`CronError::InvalidExpression`] with a formatted
    /// reason.
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidExpression(reason.into())
    }
}
