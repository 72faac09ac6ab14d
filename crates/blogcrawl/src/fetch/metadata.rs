use std::sync::Arc;

use pipeline_common::{ProgressEvent, RuntimeControls, WorkQueue};
use tracing::debug;

use super::pages::walk_pages;
use super::{AuthFailures, StageStats, close_output};
use crate::error::CrawlError;
use crate::source::PageSource;

/// Producer of a blog pipeline: pages the blog and enqueues every raw
/// record for the post processor.
pub struct MetadataFetcher<R> {
    controls: RuntimeControls,
    source: Arc<dyn PageSource<Record = R>>,
    output: Arc<WorkQueue<R>>,
    auth: Arc<AuthFailures>,
    max_pages: Option<u32>,
}

impl<R: Send + Sync + 'static> MetadataFetcher<R> {
    pub const STAGE: &'static str = "metadata";

    pub fn new(
        controls: RuntimeControls,
        source: Arc<dyn PageSource<Record = R>>,
        output: Arc<WorkQueue<R>>,
        auth: Arc<AuthFailures>,
    ) -> Self {
        Self {
            controls,
            source,
            output,
            auth,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub async fn run(self) -> Result<StageStats, CrawlError> {
        let mut stats = StageStats::default();
        let controls = &self.controls;
        let output = &self.output;

        let result = walk_pages(
            controls,
            Self::STAGE,
            self.source.as_ref(),
            &self.auth,
            self.max_pages,
            &mut stats,
            |record, stats| {
                let seq = output.enqueue(record)?;
                stats.queued += 1;
                controls.report(ProgressEvent::Queued {
                    target: controls.name.clone(),
                    stage: Self::STAGE,
                    seq,
                });
                Ok(())
            },
        )
        .await;

        debug!(
            target_name = %controls.name,
            pages = stats.pages,
            records = stats.records,
            "Metadata fetch finished"
        );
        close_output(controls, Self::STAGE, output, result.map(|()| stats))
    }
}
