use std::path::PathBuf;
use std::sync::Arc;

use media_links::MediaLinkParserSet;
use pipeline_common::{ProgressEvent, RuntimeControls, WorkQueue, sanitize_filename};
use tracing::{debug, warn};

use super::{StageStats, cancellable, close_output, enqueue_content};
use crate::config::ContentFilter;
use crate::error::CrawlError;
use crate::metadata::MetadataRenderer;
use crate::model::{ContentRef, PostRecord, derive_content_refs};

/// Middle stage of a blog pipeline.
///
/// Consumes raw records, persists each one with the run's metadata
/// renderer, and forwards the content the record points at.
pub struct PostProcessor<R> {
    controls: RuntimeControls,
    input: Arc<WorkQueue<R>>,
    output: Arc<WorkQueue<ContentRef>>,
    renderer: Arc<dyn MetadataRenderer<R>>,
    parsers: MediaLinkParserSet,
    filter: ContentFilter,
    metadata_dir: PathBuf,
}

impl<R: PostRecord> PostProcessor<R> {
    pub const STAGE: &'static str = "posts";

    pub fn new(
        controls: RuntimeControls,
        input: Arc<WorkQueue<R>>,
        output: Arc<WorkQueue<ContentRef>>,
        renderer: Arc<dyn MetadataRenderer<R>>,
        parsers: MediaLinkParserSet,
        metadata_dir: PathBuf,
    ) -> Self {
        Self {
            controls,
            input,
            output,
            renderer,
            parsers,
            filter: ContentFilter::default(),
            metadata_dir,
        }
    }

    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub async fn run(self) -> Result<StageStats, CrawlError> {
        let mut stats = StageStats::default();
        let result = self.process_all(&mut stats).await;
        debug!(
            target_name = %self.controls.name,
            written = stats.metadata_written,
            queued = stats.queued,
            "Post processing finished"
        );
        close_output(&self.controls, Self::STAGE, &self.output, result.map(|()| stats))
    }

    async fn process_all(&self, stats: &mut StageStats) -> Result<(), CrawlError> {
        let mut dir_ready = false;
        loop {
            self.controls.checkpoint(Self::STAGE).await?;
            let Some(item) = cancellable(&self.controls, self.input.dequeue()).await? else {
                break;
            };
            // Hold an item handed over after pause was requested.
            self.controls.checkpoint(Self::STAGE).await?;
            let record = item.into_payload();

            if !dir_ready {
                tokio::fs::create_dir_all(&self.metadata_dir).await?;
                dir_ready = true;
            }
            self.persist_metadata(&record, stats).await;

            let refs = derive_content_refs(&record, &self.parsers);
            enqueue_content(
                &self.controls,
                Self::STAGE,
                &self.output,
                &self.filter,
                refs,
                stats,
            )?;
        }
        Ok(())
    }

    /// Render and write one record. Failures are reported and skipped.
    async fn persist_metadata(&self, record: &R, stats: &mut StageStats) {
        let post_id = record.post_id();
        let path = self.metadata_dir.join(format!(
            "{}.{}",
            sanitize_filename(&post_id),
            self.renderer.format().extension()
        ));

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            stats.skipped += 1;
            return;
        }

        let written = match self.renderer.render(record) {
            Ok(bytes) => tokio::fs::write(&path, bytes).await.map_err(CrawlError::from),
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => {
                stats.metadata_written += 1;
                self.controls.report(ProgressEvent::MetadataWritten {
                    target: self.controls.name.clone(),
                    post_id,
                });
            }
            Err(e) => {
                warn!(
                    target_name = %self.controls.name,
                    %post_id,
                    error = %e,
                    "Failed to write metadata"
                );
                stats.failed += 1;
                self.controls.report(ProgressEvent::Failed {
                    target: self.controls.name.clone(),
                    url: path.display().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}
