//! Builds the pipeline for a target.
//!
//! Assembly is synchronous and never touches the network. Everything a
//! pipeline needs is resolved here, in a fixed order: the target is
//! validated and claimed, then its index is loaded, then a transport is
//! created, and finally the queues and stages are wired together. A failure
//! at any step returns before the next one runs.
//!
//! A target stays claimed until its pipeline is dropped, which happens when
//! `Pipeline::run` returns. Assembling the same name and variant again in the
//! meantime fails with [`CrawlError::TargetBusy`].

use std::sync::Arc;

use media_links::MediaLinkParserSet;
use parking_lot::Mutex;
use pipeline_common::{RuntimeControls, WorkQueue};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::CrawlerConfig;
use crate::error::CrawlError;
use crate::fetch::{AuthFailures, ContentFetcher, FeedCrawler, MetadataFetcher, PostProcessor};
use crate::index::IndexLoader;
use crate::metadata::{JsonRenderer, MetadataRenderer, TextRenderer, renderer_for};
use crate::model::{ApiPost, ContentRef, PostRecord, SvcPost};
use crate::pipeline::{BlogPipeline, FeedPipeline, Pipeline};
use crate::source::{
    ApiBlogSource, LikedFeedSource, PageSource, SearchSource, SvcBlogSource, TagSearchSource,
};
use crate::target::{Target, TargetConfig, TargetVariant};
use crate::transport::{Transport, TransportFactory};

const METADATA_DIR: &str = "metadata";

type TargetKey = (String, TargetVariant);

/// Targets whose pipeline has been assembled and not yet dropped.
#[derive(Debug, Default)]
struct ActiveTargets(Mutex<FxHashSet<TargetKey>>);

impl ActiveTargets {
    fn claim(self: &Arc<Self>, target: &Target) -> Result<ActiveTarget, CrawlError> {
        let key = (target.name().to_owned(), target.variant);
        if !self.0.lock().insert(key.clone()) {
            return Err(CrawlError::TargetBusy {
                name: key.0,
                variant: key.1,
            });
        }
        Ok(ActiveTarget {
            targets: self.clone(),
            key,
        })
    }
}

/// Claim on one target, released on drop.
#[derive(Debug)]
pub struct ActiveTarget {
    targets: Arc<ActiveTargets>,
    key: TargetKey,
}

impl Drop for ActiveTarget {
    fn drop(&mut self) {
        self.targets.0.lock().remove(&self.key);
    }
}

pub struct Dispatcher {
    config: Arc<CrawlerConfig>,
    indices: IndexLoader,
    transports: Arc<dyn TransportFactory>,
    parsers: MediaLinkParserSet,
    active: Arc<ActiveTargets>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("indices", &self.indices)
            .field("parsers", &self.parsers)
            .field("active", &self.active.0.lock().len())
            .finish()
    }
}

/// Everything a pipeline's stages share.
struct Parts {
    active: ActiveTarget,
    target: Target,
    controls: RuntimeControls,
    transport: Arc<dyn Transport>,
    content_queue: Arc<WorkQueue<ContentRef>>,
    content: ContentFetcher,
    auth: Arc<AuthFailures>,
}

impl Dispatcher {
    pub fn new(
        config: CrawlerConfig,
        indices: IndexLoader,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<Self, CrawlError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            indices,
            transports,
            parsers: MediaLinkParserSet::standard(),
            active: Arc::default(),
        })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Validate a raw target entry and assemble its pipeline.
    pub fn assemble_config(
        &self,
        config: &TargetConfig,
        controls: &RuntimeControls,
    ) -> Result<Pipeline, CrawlError> {
        let target = Target::from_config(config)?;
        self.assemble(&target, controls)
    }

    /// Assemble the pipeline for `target`.
    ///
    /// The pipeline runs under a child of `controls`: cancelling `controls`
    /// stops it, while a fatal error inside the run only cancels the run.
    pub fn assemble(
        &self,
        target: &Target,
        controls: &RuntimeControls,
    ) -> Result<Pipeline, CrawlError> {
        let parts = self.shared_parts(target, controls)?;
        let name = target.name();
        let pipeline = match target.variant {
            TargetVariant::PublicBlog => {
                let source: Arc<dyn PageSource<Record = ApiPost>> =
                    Arc::new(ApiBlogSource::new(parts.transport.clone(), &self.config, name));
                Pipeline::PublicBlog(self.blog_pipeline(parts, source))
            }
            TargetVariant::PrivateBlog => {
                let source: Arc<dyn PageSource<Record = SvcPost>> =
                    Arc::new(SvcBlogSource::new(parts.transport.clone(), &self.config, name));
                Pipeline::PrivateBlog(self.blog_pipeline(parts, source))
            }
            TargetVariant::LikedFeed => {
                let source = Arc::new(LikedFeedSource::new(
                    parts.transport.clone(),
                    &self.config,
                    name,
                ));
                Pipeline::LikedFeed(self.feed_pipeline(parts, source))
            }
            TargetVariant::SearchResults => {
                let source = Arc::new(SearchSource::new(
                    parts.transport.clone(),
                    &self.config,
                    name,
                ));
                Pipeline::SearchResults(self.feed_pipeline(parts, source))
            }
            TargetVariant::TagSearchResults => {
                let source = Arc::new(TagSearchSource::new(
                    parts.transport.clone(),
                    &self.config,
                    name,
                ));
                Pipeline::TagSearchResults(self.feed_pipeline(parts, source))
            }
        };
        debug!(
            target_name = %target.name(),
            variant = %target.variant,
            queues = pipeline.queue_count(),
            "Assembled pipeline"
        );
        Ok(pipeline)
    }

    fn shared_parts(
        &self,
        target: &Target,
        controls: &RuntimeControls,
    ) -> Result<Parts, CrawlError> {
        let active = self.active.claim(target)?;
        let index = self.indices.load(target)?;
        let transport = self.transports.create(target)?;

        let controls = controls.child(target.name());
        let auth = Arc::new(AuthFailures::new(self.config.fatal_auth_failures));
        let content_queue = Arc::new(WorkQueue::new("content", target.name()));
        let content = ContentFetcher::new(
            controls.clone(),
            content_queue.clone(),
            transport.clone(),
            index,
            auth.clone(),
            self.config.target_dir(target.name()),
        );
        Ok(Parts {
            active,
            target: target.clone(),
            controls,
            transport,
            content_queue,
            content,
            auth,
        })
    }

    fn blog_pipeline<R>(
        &self,
        parts: Parts,
        source: Arc<dyn PageSource<Record = R>>,
    ) -> BlogPipeline<R>
    where
        R: PostRecord,
        TextRenderer: MetadataRenderer<R>,
        JsonRenderer: MetadataRenderer<R>,
    {
        let renderer = renderer_for::<R>(parts.target.metadata_format);
        let metadata_queue = Arc::new(WorkQueue::new("metadata", parts.target.name()));
        let fetcher = MetadataFetcher::new(
            parts.controls.clone(),
            source,
            metadata_queue.clone(),
            parts.auth,
        )
        .with_max_pages(self.config.max_pages);
        let processor = PostProcessor::new(
            parts.controls.clone(),
            metadata_queue.clone(),
            parts.content_queue.clone(),
            renderer,
            self.parsers,
            self.config.target_dir(parts.target.name()).join(METADATA_DIR),
        )
        .with_filter(self.config.content_filter);
        BlogPipeline::new(
            parts.active,
            parts.target,
            parts.controls,
            metadata_queue,
            parts.content_queue,
            fetcher,
            processor,
            parts.content,
            self.config.download_concurrency,
        )
    }

    fn feed_pipeline(
        &self,
        parts: Parts,
        source: Arc<dyn PageSource<Record = ApiPost>>,
    ) -> FeedPipeline {
        let crawler = FeedCrawler::new(
            parts.controls.clone(),
            source,
            parts.content_queue.clone(),
            self.parsers,
            parts.auth,
        )
        .with_filter(self.config.content_filter)
        .with_max_pages(self.config.max_pages);
        FeedPipeline::new(
            parts.active,
            parts.target,
            parts.controls,
            parts.content_queue,
            crawler,
            parts.content,
            self.config.download_concurrency,
        )
    }
}
