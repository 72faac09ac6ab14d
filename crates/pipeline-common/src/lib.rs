//! # Pipeline Common
//!
//! This crate provides the concurrency plumbing shared by every crawl pipeline.
//! It defines the producer/consumer work queue that bridges pipeline stages,
//! the per-run controls (cancellation, cooperative pause, progress reporting)
//! and the helpers used to spawn and settle stage tasks.
//!
//! ## Features
//!
//! - `WorkQueue<T>`: unbounded FIFO with an explicit completion protocol
//! - `RuntimeControls`: cancellation token, pause token and progress sink for one run
//! - `spawn_stage` / `settle_run`: run stages as tasks and resolve a single outcome
//!
//! ## License
//!
//! MIT OR Apache-2.0
//!
//! ## Authors
//!
//! - blogcrawl contributors
//!

use thiserror::Error;

mod context;
pub mod pause;
pub mod progress;
pub mod queue;
mod run_completion;
#[cfg(test)]
pub(crate) mod test_utils;
mod utils;

/// Re-export key traits and types
pub use context::RuntimeControls;
pub use pause::{PauseController, PauseToken};
pub use progress::{FnProgress, LogProgress, NoProgress, ProgressEvent, ProgressSink, SkipReason};
pub use queue::{QueueProtocolError, QueueStats, WorkItem, WorkQueue};
pub use run_completion::{RunCompletionError, StageError, StageHandle, settle_run, spawn_stage};
pub use tokio_util::sync::CancellationToken;
pub use utils::sanitize_filename;

/// Error raised by the shared run controls.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Operation was cancelled")]
    Cancelled,
}

impl StageError for PipelineError {
    fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
