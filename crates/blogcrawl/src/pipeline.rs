//! Assembled per-target pipelines.
//!
//! A blog pipeline runs three stages over two queues:
//!
//! ```text
//! MetadataFetcher -> [metadata queue] -> PostProcessor -> [content queue] -> ContentFetcher xN
//! ```
//!
//! A feed pipeline (likes, search, tag search) runs two stages over one:
//!
//! ```text
//! FeedCrawler -> [content queue] -> ContentFetcher xN
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeline_common::{
    QueueStats, RuntimeControls, StageError, StageHandle, WorkQueue, settle_run, spawn_stage,
};
use tracing::{Instrument, Span, info, info_span, warn};

use crate::dispatcher::ActiveTarget;
use crate::error::CrawlError;
use crate::fetch::{
    ContentFetcher, DownloadLedger, FeedCrawler, MetadataFetcher, PostProcessor, StageStats,
};
use crate::index::IndexEntry;
use crate::model::{ApiPost, ContentRef, PostRecord, SvcPost};
use crate::target::{Target, TargetVariant};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub target: Target,
    pub stats: StageStats,
    pub queues: Vec<QueueStats>,
    /// Identifiers downloaded by this run, ready to merge into the index.
    pub new_entries: Vec<(String, IndexEntry)>,
    pub elapsed: Duration,
}

type Stages = Vec<StageHandle<StageStats, CrawlError>>;

fn run_span(controls: &RuntimeControls, variant: TargetVariant) -> Span {
    info_span!("crawl", target_name = %controls.name, variant = %variant)
}

fn spawn_in<F>(
    stage: &'static str,
    controls: &RuntimeControls,
    span: &Span,
    fut: F,
) -> StageHandle<StageStats, CrawlError>
where
    F: Future<Output = Result<StageStats, CrawlError>> + Send + 'static,
{
    spawn_stage(stage, controls.token.clone(), fut.instrument(span.clone()))
}

fn spawn_content_workers(
    stages: &mut Stages,
    controls: &RuntimeControls,
    span: &Span,
    fetcher: &ContentFetcher,
    workers: usize,
) {
    for _ in 0..workers.max(1) {
        stages.push(spawn_in(ContentFetcher::STAGE, controls, span, fetcher.clone().run()));
    }
}

async fn settle(
    target: Target,
    controls: &RuntimeControls,
    stages: Stages,
    queues: impl FnOnce() -> Vec<QueueStats>,
    ledger: &DownloadLedger,
    started: Instant,
) -> Result<PipelineReport, CrawlError> {
    let outputs = match settle_run(stages).await {
        Ok(outputs) => outputs,
        Err(e) => {
            let e = CrawlError::from(e);
            if e.is_cancellation() {
                info!(target_name = %controls.name, downloaded = ledger.len(), "Run cancelled");
            } else {
                warn!(target_name = %controls.name, error = %e, "Run failed");
            }
            return Err(e);
        }
    };

    let mut stats = StageStats::default();
    for (_, output) in &outputs {
        stats.merge(output);
    }
    let elapsed = started.elapsed();
    info!(
        target_name = %controls.name,
        pages = stats.pages,
        downloaded = stats.downloaded,
        skipped = stats.skipped,
        failed = stats.failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "Run finished"
    );
    Ok(PipelineReport {
        target,
        stats,
        queues: queues(),
        new_entries: ledger.take(),
        elapsed,
    })
}

/// Blog pipeline over a record schema `R`.
pub struct BlogPipeline<R: PostRecord> {
    active: ActiveTarget,
    target: Target,
    controls: RuntimeControls,
    metadata_queue: Arc<WorkQueue<R>>,
    content_queue: Arc<WorkQueue<ContentRef>>,
    fetcher: MetadataFetcher<R>,
    processor: PostProcessor<R>,
    content: ContentFetcher,
    workers: usize,
}

impl<R: PostRecord> BlogPipeline<R> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        active: ActiveTarget,
        target: Target,
        controls: RuntimeControls,
        metadata_queue: Arc<WorkQueue<R>>,
        content_queue: Arc<WorkQueue<ContentRef>>,
        fetcher: MetadataFetcher<R>,
        processor: PostProcessor<R>,
        content: ContentFetcher,
        workers: usize,
    ) -> Self {
        Self {
            active,
            target,
            controls,
            metadata_queue,
            content_queue,
            fetcher,
            processor,
            content,
            workers,
        }
    }

    pub fn queues(&self) -> Vec<QueueStats> {
        vec![self.metadata_queue.stats(), self.content_queue.stats()]
    }

    pub async fn run(self) -> Result<PipelineReport, CrawlError> {
        let started = Instant::now();
        info!(
            target_name = %self.controls.name,
            variant = %self.target.variant,
            workers = self.workers,
            "Starting blog crawl"
        );

        let span = run_span(&self.controls, self.target.variant);
        let mut stages = vec![
            spawn_in(MetadataFetcher::<R>::STAGE, &self.controls, &span, self.fetcher.run()),
            spawn_in(PostProcessor::<R>::STAGE, &self.controls, &span, self.processor.run()),
        ];
        spawn_content_workers(&mut stages, &self.controls, &span, &self.content, self.workers);

        let ledger = self.content.ledger();
        let (metadata_queue, content_queue) = (self.metadata_queue, self.content_queue);
        let _active = self.active;
        settle(
            self.target,
            &self.controls,
            stages,
            || vec![metadata_queue.stats(), content_queue.stats()],
            &ledger,
            started,
        )
        .await
    }
}

/// Feed pipeline: likes and searches.
pub struct FeedPipeline {
    active: ActiveTarget,
    target: Target,
    controls: RuntimeControls,
    content_queue: Arc<WorkQueue<ContentRef>>,
    crawler: FeedCrawler,
    content: ContentFetcher,
    workers: usize,
}

impl FeedPipeline {
    pub(crate) fn new(
        active: ActiveTarget,
        target: Target,
        controls: RuntimeControls,
        content_queue: Arc<WorkQueue<ContentRef>>,
        crawler: FeedCrawler,
        content: ContentFetcher,
        workers: usize,
    ) -> Self {
        Self {
            active,
            target,
            controls,
            content_queue,
            crawler,
            content,
            workers,
        }
    }

    pub fn queues(&self) -> Vec<QueueStats> {
        vec![self.content_queue.stats()]
    }

    pub async fn run(self) -> Result<PipelineReport, CrawlError> {
        let started = Instant::now();
        info!(
            target_name = %self.controls.name,
            variant = %self.target.variant,
            workers = self.workers,
            "Starting feed crawl"
        );

        let span = run_span(&self.controls, self.target.variant);
        let mut stages = vec![spawn_in(
            FeedCrawler::STAGE,
            &self.controls,
            &span,
            self.crawler.run(),
        )];
        spawn_content_workers(&mut stages, &self.controls, &span, &self.content, self.workers);

        let ledger = self.content.ledger();
        let content_queue = self.content_queue;
        let _active = self.active;
        settle(
            self.target,
            &self.controls,
            stages,
            || vec![content_queue.stats()],
            &ledger,
            started,
        )
        .await
    }
}

/// A pipeline ready to run, one variant per target kind.
pub enum Pipeline {
    PublicBlog(BlogPipeline<ApiPost>),
    PrivateBlog(BlogPipeline<SvcPost>),
    LikedFeed(FeedPipeline),
    SearchResults(FeedPipeline),
    TagSearchResults(FeedPipeline),
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("variant", &self.variant())
            .field("target", self.target())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn variant(&self) -> TargetVariant {
        match self {
            Self::PublicBlog(_) => TargetVariant::PublicBlog,
            Self::PrivateBlog(_) => TargetVariant::PrivateBlog,
            Self::LikedFeed(_) => TargetVariant::LikedFeed,
            Self::SearchResults(_) => TargetVariant::SearchResults,
            Self::TagSearchResults(_) => TargetVariant::TagSearchResults,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            Self::PublicBlog(p) => &p.target,
            Self::PrivateBlog(p) => &p.target,
            Self::LikedFeed(p) | Self::SearchResults(p) | Self::TagSearchResults(p) => &p.target,
        }
    }

    pub fn controls(&self) -> &RuntimeControls {
        match self {
            Self::PublicBlog(p) => &p.controls,
            Self::PrivateBlog(p) => &p.controls,
            Self::LikedFeed(p) | Self::SearchResults(p) | Self::TagSearchResults(p) => &p.controls,
        }
    }

    /// Current statistics of every queue this pipeline owns.
    pub fn queues(&self) -> Vec<QueueStats> {
        match self {
            Self::PublicBlog(p) => p.queues(),
            Self::PrivateBlog(p) => p.queues(),
            Self::LikedFeed(p) | Self::SearchResults(p) | Self::TagSearchResults(p) => p.queues(),
        }
    }

    pub fn queue_count(&self) -> usize {
        self.queues().len()
    }

    /// Downloads recorded so far, including after a cancelled run.
    pub fn ledger(&self) -> Arc<DownloadLedger> {
        match self {
            Self::PublicBlog(p) => p.content.ledger(),
            Self::PrivateBlog(p) => p.content.ledger(),
            Self::LikedFeed(p) | Self::SearchResults(p) | Self::TagSearchResults(p) => {
                p.content.ledger()
            }
        }
    }

    /// Run every stage to completion.
    ///
    /// Ends with [`CrawlError::Cancelled`] when the run was cancelled, or
    /// with the first stage failure that was not a cancellation.
    pub async fn run(self) -> Result<PipelineReport, CrawlError> {
        match self {
            Self::PublicBlog(p) => p.run().await,
            Self::PrivateBlog(p) => p.run().await,
            Self::LikedFeed(p) | Self::SearchResults(p) | Self::TagSearchResults(p) => {
                p.run().await
            }
        }
    }
}
