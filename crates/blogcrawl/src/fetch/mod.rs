//! Pipeline stages.
//!
//! Every stage loop follows the same shape: pass the run's checkpoint
//! (cancellation, then pause) before each unit of work, race blocking calls
//! against cancellation, and re-check cancellation once they return so
//! in-flight work is discarded rather than handed on.

mod content;
mod feed;
mod metadata;
mod pages;
mod posts;

pub use content::{ContentFetcher, DownloadLedger};
pub use feed::FeedCrawler;
pub use metadata::MetadataFetcher;
pub use posts::PostProcessor;

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use pipeline_common::{ProgressEvent, RuntimeControls, SkipReason, WorkQueue};
use tracing::warn;

use crate::config::ContentFilter;
use crate::error::{CrawlError, TransportError};
use crate::model::ContentRef;

/// Counters a stage returns when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    pub pages: u32,
    pub records: u64,
    pub queued: u64,
    pub metadata_written: u64,
    pub downloaded: u64,
    pub bytes: u64,
    /// Already in the index or already fetched earlier in this run.
    pub skipped: u64,
    /// Excluded by the content filter.
    pub filtered: u64,
    pub failed: u64,
}

impl StageStats {
    pub fn merge(&mut self, other: &StageStats) {
        self.pages += other.pages;
        self.records += other.records;
        self.queued += other.queued;
        self.metadata_written += other.metadata_written;
        self.downloaded += other.downloaded;
        self.bytes += other.bytes;
        self.skipped += other.skipped;
        self.filtered += other.filtered;
        self.failed += other.failed;
    }
}

/// Consecutive authentication failures across every stage of one run.
#[derive(Debug)]
pub struct AuthFailures {
    threshold: u32,
    consecutive: AtomicU32,
}

impl AuthFailures {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: AtomicU32::new(0),
        }
    }

    pub fn record_success(&self) {
        self.consecutive.store(0, Ordering::Relaxed);
    }

    /// Count a failed request. Returns the failure count once the session
    /// must be treated as rejected.
    pub fn record_failure(&self, error: &TransportError) -> Option<u32> {
        if !error.is_session_fatal() {
            return None;
        }
        let failures = self.consecutive.fetch_add(1, Ordering::Relaxed) + 1;
        (failures >= self.threshold).then_some(failures)
    }
}

/// Await `fut` unless the run is cancelled first.
///
/// Cancellation observed after `fut` completed still wins, so the caller
/// never acts on a result that arrived after the run was stopped.
pub(crate) async fn cancellable<F: Future>(
    controls: &RuntimeControls,
    fut: F,
) -> Result<F::Output, CrawlError> {
    let output = tokio::select! {
        biased;
        _ = controls.token.cancelled() => return Err(CrawlError::Cancelled),
        output = fut => output,
    };
    if controls.is_cancelled() {
        return Err(CrawlError::Cancelled);
    }
    Ok(output)
}

/// Filter derived content and hand the rest to the content queue.
pub(crate) fn enqueue_content(
    controls: &RuntimeControls,
    stage: &'static str,
    queue: &WorkQueue<ContentRef>,
    filter: &ContentFilter,
    refs: Vec<ContentRef>,
    stats: &mut StageStats,
) -> Result<(), CrawlError> {
    for content in refs {
        if !filter.allows(&content) {
            stats.filtered += 1;
            controls.report(ProgressEvent::Skipped {
                target: controls.name.clone(),
                url: content.url,
                reason: SkipReason::Filtered,
            });
            continue;
        }
        let seq = queue.enqueue(content)?;
        stats.queued += 1;
        controls.report(ProgressEvent::Queued {
            target: controls.name.clone(),
            stage,
            seq,
        });
    }
    Ok(())
}

/// Mark a producer's output queue complete whatever the stage outcome, so
/// consumers drain and stop instead of waiting forever.
pub(crate) fn close_output<T, O>(
    controls: &RuntimeControls,
    stage: &'static str,
    queue: &WorkQueue<T>,
    result: Result<O, CrawlError>,
) -> Result<O, CrawlError> {
    let closed = queue.mark_complete();
    if let Err(e) = &closed {
        warn!(target_name = %controls.name, stage, error = %e, "Output queue already closed");
    }
    controls.report(ProgressEvent::StageFinished {
        target: controls.name.clone(),
        stage,
    });
    let output = result?;
    closed?;
    Ok(output)
}
