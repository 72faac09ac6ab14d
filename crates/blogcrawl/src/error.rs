use std::path::PathBuf;

use pipeline_common::{PipelineError, QueueProtocolError, RunCompletionError, StageError};

use crate::target::TargetVariant;

/// Rejected target or run configuration. Raised before any I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unsupported target variant `{0}`")]
    UnsupportedTarget(String),

    #[error("unsupported metadata format `{0}`")]
    UnsupportedFormat(String),

    #[error("invalid target `{name}`: {reason}")]
    InvalidTarget { name: String, reason: String },

    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

impl ConfigurationError {
    pub fn invalid_target(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_setting(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexLoadError {
    #[error("failed to read index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl IndexLoadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Corrupt { path, .. } => path,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("session rejected with HTTP {status} for {url}")]
    Unauthorized { status: u16, url: String },

    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("undecodable response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("failed to build HTTP client: {reason}")]
    Client { reason: String },
}

impl TransportError {
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    pub fn decode(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a non-success status code to an error.
    pub fn from_status(status: u16, url: impl Into<String>) -> Self {
        let url = url.into();
        match status {
            401 | 403 => Self::Unauthorized { status, url },
            404 | 410 => Self::NotFound { url },
            429 => Self::RateLimited { url },
            _ => Self::HttpStatus { status, url },
        }
    }

    /// True when the session itself was rejected and further requests with
    /// the same credentials are pointless.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("index load error: {0}")]
    IndexLoad(#[from] IndexLoadError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("queue protocol error: {0}")]
    QueueProtocol(#[from] QueueProtocolError),

    #[error("failed to render metadata for post {post_id}: {reason}")]
    Render { post_id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("giving up after {failures} consecutive authentication failures: {source}")]
    SessionRejected {
        failures: u32,
        #[source]
        source: TransportError,
    },

    #[error("target `{name}` ({variant}) already has a pipeline")]
    TargetBusy { name: String, variant: TargetVariant },

    #[error("stage `{stage}` panicked: {message}")]
    StagePanicked { stage: &'static str, message: String },

    #[error("crawl cancelled")]
    Cancelled,
}

impl CrawlError {
    pub fn render(post_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Render {
            post_id: post_id.into(),
            reason: reason.to_string(),
        }
    }
}

impl StageError for CrawlError {
    fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<RunCompletionError<CrawlError>> for CrawlError {
    fn from(err: RunCompletionError<CrawlError>) -> Self {
        match err {
            RunCompletionError::Stage { source, .. } => source,
            RunCompletionError::Panicked { stage, message } => {
                Self::StagePanicked { stage, message }
            }
            RunCompletionError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<PipelineError> for CrawlError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Cancelled => Self::Cancelled,
        }
    }
}
