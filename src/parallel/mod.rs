//! Batch execution over a bounded worker pool.
//!
//! The executor only manages threads and outcomes. Domain work happens in a
//! [`Pipeline`](crate::pipeline::Pipeline), and the worker count is decided by
//! the caller (see [`policy`]) so execution stays independent of the host.
//!
//! ```text
//! ┌─────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │  Producer   │───▶│  bounded queue   │───▶│  N workers       │
//! │ (work items)│    │  (2 × workers)   │    │  pipeline.process│
//! └─────────────┘    └──────────────────┘    └────────┬─────────┘
//!                                                     │ outcomes
//!                    ┌──────────────────┐             │
//!                    │    Collector     │◀────────────┘
//!                    │ log + summarize  │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use batchcryptor::parallel::{ExecutionStrategy, ResourceMode, determine_worker_count};
//!
//! let workers = determine_worker_count(ResourceMode::Half, None, 8);
//! assert_eq!(workers, 4);
//! assert!(matches!(
//!     ExecutionStrategy::from_worker_count(workers),
//!     ExecutionStrategy::Parallel { workers: 4 }
//! ));
//! ```

pub mod cancel;
pub mod core;
pub mod policy;
pub mod progress;

pub use cancel::CancellationToken;
pub use self::core::{BatchSummary, ExecutionStrategy, ExecutorError, ItemFailure, TaskExecutor};
pub use policy::{ResourceMode, available_cores, determine_worker_count};
pub use progress::BatchProgress;
