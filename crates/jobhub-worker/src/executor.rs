//! Handler trait and registry — dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::outcome::JobOutcome;

/// Trait for job handler implementations.
///
/// The payload arrives as the opaque string the client stored; handlers that
/// want typed arguments should be registered through
/// [`TypedHandler`](crate::handler::TypedHandler) instead of implementing
/// this trait directly. The cancellation token is cancelled when the
/// processor stops; handlers are expected to observe it and return promptly.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes.
    fn job_type(&self) -> &str;

    /// Execute one job payload.
    async fn execute(&self, payload: Option<&str>, cancel: CancellationToken) -> JobOutcome;
}

/// Registry mapping job type identifiers to their handlers.
///
/// Populated before the processor starts and read-only afterwards; lookup
/// happens once per job execution.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    /// Registered job handlers by type.
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler. A later registration for the same type
    /// replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Look up the handler for a job type.
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Check if a handler is registered for a job type.
    pub fn contains(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types.
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
