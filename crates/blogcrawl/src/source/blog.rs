use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use super::{Endpoint, Page, PageCursor, PageSource, blog_identifier, next_offset};
use crate::config::CrawlerConfig;
use crate::error::TransportError;
use crate::model::{ApiPost, SvcPost};
use crate::transport::{Transport, TransportRequest};

#[derive(Debug, Deserialize)]
struct ApiPostsResponse {
    #[serde(default)]
    total_posts: Option<u64>,
    #[serde(default)]
    posts: Vec<ApiPost>,
}

/// Posts of a public blog, offset-paged through the public API.
pub struct ApiBlogSource {
    endpoint: Endpoint,
    blog: String,
}

impl ApiBlogSource {
    pub fn new(transport: Arc<dyn Transport>, config: &CrawlerConfig, name: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, config),
            blog: blog_identifier(name),
        }
    }
}

#[async_trait]
impl PageSource for ApiBlogSource {
    type Record = ApiPost;

    fn page_url(&self, cursor: &PageCursor) -> String {
        let e = &self.endpoint;
        format!(
            "{}/v2/blog/{}/posts?api_key={}&offset={}&limit={}&reblog_info=true",
            e.api_base,
            self.blog,
            urlencoding::encode(&e.api_key),
            cursor.offset,
            e.page_size
        )
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page<ApiPost>, TransportError> {
        let url = self.page_url(cursor);
        let response: ApiPostsResponse = self.endpoint.get_json(TransportRequest::get(url)).await?;
        trace!(blog = %self.blog, posts = response.posts.len(), "Fetched blog page");
        let next = next_offset(
            cursor,
            response.posts.len(),
            self.endpoint.page_size,
            response.total_posts,
        );
        Ok(Page {
            records: response.posts,
            next,
        })
    }

    fn skip_failed(&self, cursor: &PageCursor) -> Option<PageCursor> {
        Some(cursor.after_offset(self.endpoint.page_size as u64))
    }
}

#[derive(Debug, Deserialize)]
struct SvcPostsResponse {
    #[serde(default)]
    posts: Vec<SvcPost>,
}

/// Posts of a login-only blog, read through the dashboard service with the
/// session cookies of the transport.
pub struct SvcBlogSource {
    endpoint: Endpoint,
    blog: String,
}

impl SvcBlogSource {
    pub fn new(transport: Arc<dyn Transport>, config: &CrawlerConfig, name: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, config),
            blog: name.to_owned(),
        }
    }
}

#[async_trait]
impl PageSource for SvcBlogSource {
    type Record = SvcPost;

    fn page_url(&self, cursor: &PageCursor) -> String {
        let e = &self.endpoint;
        format!(
            "{}/svc/indash_blog?tumblelog_name_or_id={}&post_id=&limit={}&offset={}&should_bypass_safemode=true",
            e.service_base,
            urlencoding::encode(&self.blog),
            e.page_size,
            cursor.offset
        )
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page<SvcPost>, TransportError> {
        let request = TransportRequest::get(self.page_url(cursor))
            .with_header("X-Requested-With", "XMLHttpRequest")
            .with_header(
                "Referer",
                format!("{}/dashboard/blog/{}", self.endpoint.service_base, self.blog),
            );
        let response: SvcPostsResponse = self.endpoint.get_json(request).await?;
        trace!(blog = %self.blog, posts = response.posts.len(), "Fetched private blog page");
        let next = next_offset(cursor, response.posts.len(), self.endpoint.page_size, None);
        Ok(Page {
            records: response.posts,
            next,
        })
    }

    fn skip_failed(&self, cursor: &PageCursor) -> Option<PageCursor> {
        Some(cursor.after_offset(self.endpoint.page_size as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::CannedTransport;
    use serde_json::json;

    fn config() -> CrawlerConfig {
        CrawlerConfig::default()
            .with_api_base("https://api.test")
            .with_service_base("https://www.test")
            .with_api_key("k")
            .with_page_size(2)
    }

    fn api_post(id: u64) -> serde_json::Value {
        json!({"id": id, "blog_name": "staff", "type": "text", "post_url": "u", "timestamp": 1})
    }

    #[tokio::test]
    async fn test_api_blog_pages_until_total() {
        let transport = CannedTransport::default()
            .with(
                "https://api.test/v2/blog/staff.tumblr.com/posts?api_key=k&offset=0&limit=2&reblog_info=true",
                json!({"meta": {"status": 200}, "response": {"total_posts": 3, "posts": [api_post(1), api_post(2)]}}),
            )
            .with(
                "https://api.test/v2/blog/staff.tumblr.com/posts?api_key=k&offset=2&limit=2&reblog_info=true",
                json!({"response": {"total_posts": 3, "posts": [api_post(3)]}}),
            );
        let source = ApiBlogSource::new(Arc::new(transport), &config(), "staff");

        let first = source.fetch_page(&PageCursor::first()).await.unwrap();
        assert_eq!(first.records.len(), 2);
        let next = first.next.unwrap();
        let second = source.fetch_page(&next).await.unwrap();
        assert_eq!(second.records[0].id, 3);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn test_svc_blog_sends_ajax_header() {
        let transport = Arc::new(CannedTransport::default().with(
            "https://www.test/svc/indash_blog?tumblelog_name_or_id=hidden&post_id=&limit=2&offset=0&should_bypass_safemode=true",
            json!({"response": {"posts": [{"id": "9", "blog": {"name": "hidden"}, "type": "photo", "post_url": "u", "timestamp": 5}]}}),
        ));
        let source = SvcBlogSource::new(transport.clone(), &config(), "hidden");

        let page = source.fetch_page(&PageCursor::first()).await.unwrap();
        assert_eq!(page.records[0].id, "9");
        assert!(page.next.is_none());

        let requests = transport.requests.lock();
        assert!(requests[0]
            .headers
            .iter()
            .any(|(k, v)| k == "X-Requested-With" && v == "XMLHttpRequest"));
    }

    #[test]
    fn test_offset_sources_can_skip_failed_pages() {
        let source = ApiBlogSource::new(Arc::new(CannedTransport::default()), &config(), "staff");
        let skipped = source.skip_failed(&PageCursor::first()).unwrap();
        assert_eq!(skipped.offset, 2);
    }
}
