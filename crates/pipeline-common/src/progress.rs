//! Progress events and the sink stages report them to.
//!
//! Sinks are called inline from stage loops, so an implementation must never
//! block for long; anything expensive belongs behind a channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why an item was not downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The index already records this item.
    AlreadyDownloaded,
    /// The item's kind is disabled by configuration.
    Filtered,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A page of remote records was fetched.
    PageFetched {
        target: Arc<str>,
        page: u32,
        records: usize,
    },
    /// A work item was handed to the next stage.
    Queued {
        target: Arc<str>,
        stage: &'static str,
        seq: u64,
    },
    /// A file was written.
    Downloaded {
        target: Arc<str>,
        url: String,
        bytes: u64,
    },
    Skipped {
        target: Arc<str>,
        url: String,
        reason: SkipReason,
    },
    /// A single item failed and was skipped; the run continues.
    Failed {
        target: Arc<str>,
        url: String,
        error: String,
    },
    /// A metadata record was rendered and persisted.
    MetadataWritten { target: Arc<str>, post_id: String },
    /// A stage observed the pause signal and is waiting.
    Paused {
        target: Arc<str>,
        stage: &'static str,
    },
    /// A stage finished its loop.
    StageFinished {
        target: Arc<str>,
        stage: &'static str,
    },
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes events to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PageFetched {
                target,
                page,
                records,
            } => debug!(target_name = %target, page, records, "Fetched page"),
            ProgressEvent::Queued { target, stage, seq } => {
                debug!(target_name = %target, stage, seq, "Queued item")
            }
            ProgressEvent::Downloaded { target, url, bytes } => {
                info!(target_name = %target, %url, bytes, "Downloaded")
            }
            ProgressEvent::Skipped {
                target,
                url,
                reason,
            } => debug!(target_name = %target, %url, ?reason, "Skipped"),
            ProgressEvent::Failed { target, url, error } => {
                warn!(target_name = %target, %url, %error, "Item failed")
            }
            ProgressEvent::MetadataWritten { target, post_id } => {
                debug!(target_name = %target, %post_id, "Wrote metadata")
            }
            ProgressEvent::Paused { target, stage } => {
                info!(target_name = %target, stage, "Paused")
            }
            ProgressEvent::StageFinished { target, stage } => {
                debug!(target_name = %target, stage, "Stage finished")
            }
        }
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        // A closed receiver only means nobody is listening anymore.
        let _ = self.send(event);
    }
}

/// Adapts a closure into a sink.
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}
