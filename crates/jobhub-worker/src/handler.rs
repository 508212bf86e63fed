//! Typed handler adapter.
//!
//! Handlers that want structured arguments implement [`PayloadHandler`] with
//! a concrete `Args` type; [`TypedHandler`] wraps them into a [`JobHandler`]
//! and owns the deserialization step, so the registry entry carries the
//! decoder alongside the handler.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::executor::JobHandler;
use crate::outcome::JobOutcome;

/// A job handler with a typed argument.
#[async_trait]
pub trait PayloadHandler: Send + Sync + 'static {
    /// The deserialized input type.
    type Args: DeserializeOwned + Send;

    /// Get the job type this handler processes.
    fn job_type(&self) -> &str;

    /// Process one decoded argument value.
    async fn handle(&self, args: Self::Args, cancel: CancellationToken) -> JobOutcome;
}

/// Adapter from a [`PayloadHandler`] to the registry's [`JobHandler`].
///
/// A payload that is absent or does not decode as `Args` is a
/// **non-retryable** failure.
#[derive(Debug)]
pub struct TypedHandler<H> {
    inner: H,
}

impl<H> TypedHandler<H> {
    /// Wrap a typed handler.
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H> JobHandler for TypedHandler<H>
where
    H: PayloadHandler + std::fmt::Debug,
{
    fn job_type(&self) -> &str {
        self.inner.job_type()
    }

    async fn execute(&self, payload: Option<&str>, cancel: CancellationToken) -> JobOutcome {
        let Some(raw) = payload else {
            return JobOutcome::failure_no_retry(format!(
                "job type '{}' requires a payload",
                self.inner.job_type()
            ));
        };

        match serde_json::from_str::<H::Args>(raw) {
            Ok(args) => self.inner.handle(args, cancel).await,
            Err(e) => JobOutcome::failure_no_retry(format!(
                "payload does not match the declared input of '{}': {e}",
                self.inner.job_type()
            )),
        }
    }
}
