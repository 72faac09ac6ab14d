use std::sync::Arc;

use media_links::MediaLinkParserSet;
use pipeline_common::{RuntimeControls, WorkQueue};
use tracing::debug;

use super::pages::walk_pages;
use super::{AuthFailures, StageStats, close_output, enqueue_content};
use crate::config::ContentFilter;
use crate::error::CrawlError;
use crate::model::{ApiPost, ContentRef, derive_content_refs};
use crate::source::PageSource;

/// Producer of a feed pipeline (likes and searches).
///
/// Feeds have no metadata stage: content is derived from each page as it
/// arrives and goes straight to the content queue.
pub struct FeedCrawler {
    controls: RuntimeControls,
    source: Arc<dyn PageSource<Record = ApiPost>>,
    output: Arc<WorkQueue<ContentRef>>,
    parsers: MediaLinkParserSet,
    filter: ContentFilter,
    auth: Arc<AuthFailures>,
    max_pages: Option<u32>,
}

impl FeedCrawler {
    pub const STAGE: &'static str = "feed";

    pub fn new(
        controls: RuntimeControls,
        source: Arc<dyn PageSource<Record = ApiPost>>,
        output: Arc<WorkQueue<ContentRef>>,
        parsers: MediaLinkParserSet,
        auth: Arc<AuthFailures>,
    ) -> Self {
        Self {
            controls,
            source,
            output,
            parsers,
            filter: ContentFilter::default(),
            auth,
            max_pages: None,
        }
    }

    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub async fn run(self) -> Result<StageStats, CrawlError> {
        let mut stats = StageStats::default();
        let controls = &self.controls;

        let result = walk_pages(
            controls,
            Self::STAGE,
            self.source.as_ref(),
            &self.auth,
            self.max_pages,
            &mut stats,
            |post, stats| {
                let refs = derive_content_refs(&post, &self.parsers);
                enqueue_content(controls, Self::STAGE, &self.output, &self.filter, refs, stats)
            },
        )
        .await;

        debug!(
            target_name = %controls.name,
            pages = stats.pages,
            queued = stats.queued,
            "Feed crawl finished"
        );
        close_output(controls, Self::STAGE, &self.output, result.map(|()| stats))
    }
}
