use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use pipeline_common::{ProgressEvent, RuntimeControls, SkipReason, WorkQueue};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use super::{AuthFailures, StageStats, cancellable};
use crate::error::CrawlError;
use crate::index::{Index, IndexEntry};
use crate::model::ContentRef;
use crate::transport::{Transport, TransportRequest};

/// Entries downloaded during a run, kept outside the stage results so they
/// survive a cancelled or failed run.
#[derive(Debug, Default)]
pub struct DownloadLedger {
    entries: Mutex<Vec<(String, IndexEntry)>>,
}

impl DownloadLedger {
    pub fn record(&self, id: String, entry: IndexEntry) {
        self.entries.lock().push((id, entry));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn take(&self) -> Vec<(String, IndexEntry)> {
        std::mem::take(&mut *self.entries.lock())
    }
}

/// Consumer stage that downloads content items.
///
/// Clones share their in-run bookkeeping, so running several clones over
/// the same queue downloads each item at most once.
#[derive(Clone)]
pub struct ContentFetcher {
    controls: RuntimeControls,
    input: Arc<WorkQueue<ContentRef>>,
    transport: Arc<dyn Transport>,
    index: Arc<Index>,
    auth: Arc<AuthFailures>,
    target_dir: PathBuf,
    seen: Arc<Mutex<FxHashSet<String>>>,
    ledger: Arc<DownloadLedger>,
}

impl ContentFetcher {
    pub const STAGE: &'static str = "content";

    pub fn new(
        controls: RuntimeControls,
        input: Arc<WorkQueue<ContentRef>>,
        transport: Arc<dyn Transport>,
        index: Arc<Index>,
        auth: Arc<AuthFailures>,
        target_dir: PathBuf,
    ) -> Self {
        Self {
            controls,
            input,
            transport,
            index,
            auth,
            target_dir,
            seen: Arc::default(),
            ledger: Arc::default(),
        }
    }

    pub fn ledger(&self) -> Arc<DownloadLedger> {
        self.ledger.clone()
    }

    pub async fn run(self) -> Result<StageStats, CrawlError> {
        let mut stats = StageStats::default();
        let result = self.download_all(&mut stats).await;
        self.controls.report(ProgressEvent::StageFinished {
            target: self.controls.name.clone(),
            stage: Self::STAGE,
        });
        debug!(
            target_name = %self.controls.name,
            downloaded = stats.downloaded,
            skipped = stats.skipped,
            failed = stats.failed,
            "Content worker finished"
        );
        result.map(|()| stats)
    }

    async fn download_all(&self, stats: &mut StageStats) -> Result<(), CrawlError> {
        let mut dir_ready = false;
        loop {
            self.controls.checkpoint(Self::STAGE).await?;
            let Some(item) = cancellable(&self.controls, self.input.dequeue()).await? else {
                return Ok(());
            };
            // A worker parked in `dequeue` can be handed an item after pause
            // was requested; hold it until resumed.
            self.controls.checkpoint(Self::STAGE).await?;
            let content = item.into_payload();

            if self.index.contains(&content.id) || !self.claim(&content.id) {
                stats.skipped += 1;
                self.controls.report(ProgressEvent::Skipped {
                    target: self.controls.name.clone(),
                    url: content.url,
                    reason: SkipReason::AlreadyDownloaded,
                });
                continue;
            }

            let request = TransportRequest::get(&content.url);
            let response =
                cancellable(&self.controls, self.transport.issue_request(request)).await?;
            let body = match response {
                Ok(response) => {
                    self.auth.record_success();
                    response.body
                }
                Err(err) => {
                    warn!(
                        target_name = %self.controls.name,
                        url = %content.url,
                        error = %err,
                        "Download failed"
                    );
                    self.release(&content.id);
                    stats.failed += 1;
                    self.controls.report(ProgressEvent::Failed {
                        target: self.controls.name.clone(),
                        url: content.url.clone(),
                        error: err.to_string(),
                    });
                    if let Some(failures) = self.auth.record_failure(&err) {
                        return Err(CrawlError::SessionRejected {
                            failures,
                            source: err,
                        });
                    }
                    continue;
                }
            };

            if !dir_ready {
                tokio::fs::create_dir_all(&self.target_dir).await?;
                dir_ready = true;
            }
            let path = self.target_dir.join(&content.file_name);
            if let Err(e) = tokio::fs::write(&path, &body).await {
                warn!(
                    target_name = %self.controls.name,
                    path = %path.display(),
                    error = %e,
                    "Failed to write file"
                );
                self.release(&content.id);
                stats.failed += 1;
                self.controls.report(ProgressEvent::Failed {
                    target: self.controls.name.clone(),
                    url: content.url,
                    error: e.to_string(),
                });
                continue;
            }

            let bytes = body.len() as u64;
            stats.downloaded += 1;
            stats.bytes += bytes;
            self.ledger.record(
                content.id,
                IndexEntry {
                    file_name: content.file_name,
                    kind: content.kind,
                },
            );
            self.controls.report(ProgressEvent::Downloaded {
                target: self.controls.name.clone(),
                url: content.url,
                bytes,
            });
        }
    }

    /// Reserve `id` for this worker. False when it is already downloaded or
    /// in flight elsewhere in the run.
    fn claim(&self, id: &str) -> bool {
        self.seen.lock().insert(id.to_owned())
    }

    /// Give `id` back after a failed download so a later duplicate retries it.
    fn release(&self, id: &str) {
        self.seen.lock().remove(id);
    }
}
