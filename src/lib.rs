//! # JobHub
//!
//! A durable background job processing engine. Application code submits
//! jobs through the [`JobClient`]; the [`JobProcessor`] executes them
//! asynchronously with retry, scheduling, recurrence, continuation, and
//! batch semantics against any [`JobStorage`] backend.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use jobhub::{
//!     HandlerRegistry, JobClient, JobProcessor, MemoryStorage, ProcessorConfig,
//! };
//!
//! # async fn example(registry: HandlerRegistry) -> jobhub::AppResult<()> {
//! let storage = Arc::new(MemoryStorage::new());
//! let client = JobClient::new(storage.clone());
//! let processor = JobProcessor::new(storage, registry, ProcessorConfig::default());
//!
//! processor.start().await;
//! let job_id = client.enqueue("send_welcome_email", &"user-42", 3).await?;
//! # let _ = job_id;
//! processor.stop().await;
//! # Ok(())
//! # }
//! ```

pub use jobhub_core::config::{EngineConfig, ProcessorConfig};
pub use jobhub_core::error::{AppError, ErrorKind};
pub use jobhub_core::result::AppResult;
pub use jobhub_core::traits::storage::JobStorage;

pub use jobhub_entity::job::{Job, JobState};
pub use jobhub_entity::recurring::RecurringJob;

pub use jobhub_cron::{CronError, CronSchedule};

pub use jobhub_client::JobClient;

pub use jobhub_memory::MemoryStorage;

pub use jobhub_worker::{
    HandlerRegistry, JobHandler, JobOutcome, JobProcessor, PayloadHandler, TypedHandler,
};
