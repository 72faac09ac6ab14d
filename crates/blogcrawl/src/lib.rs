//! # Blogcrawl Engine
//!
//! Per-target crawl pipelines for blogs, liked feeds and searches.
//!
//! A [`Dispatcher`] turns a [`Target`] into a ready-to-run [`Pipeline`]:
//! it loads the target's download index, creates a transport and wires the
//! variant's stages together over [`WorkQueue`](pipeline_common::WorkQueue)s.
//! Running the pipeline pages the remote listing, renders post metadata
//! (blogs only), and downloads every item the index does not already record.
//!
//! Runs are controlled through [`RuntimeControls`](pipeline_common::RuntimeControls):
//! cancellation stops every stage at its next checkpoint, pause holds them
//! there until resumed.
//!
//! ```no_run
//! use std::sync::Arc;
//! use blogcrawl_engine::{
//!     CrawlerConfig, Dispatcher, FsIndexStore, HttpTransportFactory, IndexLoader, TargetConfig,
//! };
//! use pipeline_common::{CancellationToken, RuntimeControls};
//!
//! # async fn run() -> Result<(), blogcrawl_engine::CrawlError> {
//! let store = Arc::new(FsIndexStore::new("indices"));
//! let dispatcher = Dispatcher::new(
//!     CrawlerConfig::default().with_api_key("key"),
//!     IndexLoader::per_target(store),
//!     Arc::new(HttpTransportFactory::default()),
//! )?;
//! let controls = RuntimeControls::detached(CancellationToken::new());
//! let pipeline = dispatcher.assemble_config(&TargetConfig::new("staff", "public-blog"), &controls)?;
//! let report = pipeline.run().await?;
//! println!("downloaded {}", report.stats.downloaded);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fetch;
pub mod index;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod target;
pub mod transport;

pub use config::{ContentFilter, CrawlerConfig, TransportConfig};
pub use dispatcher::Dispatcher;
pub use error::{ConfigurationError, CrawlError, IndexLoadError, TransportError};
pub use fetch::{DownloadLedger, StageStats};
pub use index::{FsIndexStore, Index, IndexEntry, IndexLoader, IndexRegistry, IndexStore};
pub use metadata::{JsonRenderer, MetadataRenderer, TextRenderer};
pub use model::{ApiPost, ContentKind, ContentRef, PostRecord, SvcPost};
pub use pipeline::{Pipeline, PipelineReport};
pub use target::{MetadataFormat, Target, TargetConfig, TargetIdentity, TargetVariant};
pub use transport::{
    HttpTransport, HttpTransportFactory, Transport, TransportFactory, TransportRequest,
    TransportResponse,
};
