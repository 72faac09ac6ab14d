//! Paged remote listings, one source per target variant.

mod blog;
mod feed;

pub use blog::{ApiBlogSource, SvcBlogSource};
pub use feed::{LikedFeedSource, SearchSource, TagSearchSource};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CrawlerConfig;
use crate::error::TransportError;
use crate::transport::{Transport, TransportRequest};

/// Position in a paged listing.
///
/// Offset-paged sources advance `offset`; time-paged sources advance
/// `before`. `page` only counts pages for progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub offset: u64,
    pub before: Option<i64>,
}

impl PageCursor {
    pub fn first() -> Self {
        Self::default()
    }

    pub fn after_offset(&self, records: u64) -> Self {
        Self {
            page: self.page + 1,
            offset: self.offset + records,
            before: None,
        }
    }

    pub fn before(&self, timestamp: i64) -> Self {
        Self {
            page: self.page + 1,
            offset: 0,
            before: Some(timestamp),
        }
    }
}

pub struct Page<R> {
    pub records: Vec<R>,
    pub next: Option<PageCursor>,
}

impl<R> Page<R> {
    pub fn last(records: Vec<R>) -> Self {
        Self {
            records,
            next: None,
        }
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    type Record: Send + 'static;

    fn page_url(&self, cursor: &PageCursor) -> String;

    async fn fetch_page(&self, cursor: &PageCursor)
    -> Result<Page<Self::Record>, TransportError>;

    /// Where to resume after `cursor` failed, if the listing can skip a page.
    fn skip_failed(&self, _cursor: &PageCursor) -> Option<PageCursor> {
        None
    }
}

/// Connection details shared by every source.
#[derive(Clone)]
pub(crate) struct Endpoint {
    pub transport: Arc<dyn Transport>,
    pub api_base: String,
    pub service_base: String,
    pub api_key: String,
    pub page_size: u32,
}

impl Endpoint {
    pub fn new(transport: Arc<dyn Transport>, config: &CrawlerConfig) -> Self {
        Self {
            transport,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            service_base: config.service_base.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
        }
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: TransportRequest,
    ) -> Result<T, TransportError> {
        let response = self.transport.issue_request(request).await?;
        let envelope: Envelope<T> = response.json()?;
        Ok(envelope.response)
    }
}

/// Every endpoint wraps its payload in `{"response": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

/// `name` as the public API expects a blog identifier.
pub(crate) fn blog_identifier(name: &str) -> String {
    if name.contains('.') {
        name.to_owned()
    } else {
        format!("{name}.tumblr.com")
    }
}

/// Next offset cursor, or `None` once a short page signals the end.
pub(crate) fn next_offset(
    cursor: &PageCursor,
    received: usize,
    page_size: u32,
    total: Option<u64>,
) -> Option<PageCursor> {
    if received == 0 || received < page_size as usize {
        return None;
    }
    let next = cursor.after_offset(received as u64);
    match total {
        Some(total) if next.offset >= total => None,
        _ => Some(next),
    }
}
