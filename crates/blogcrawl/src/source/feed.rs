use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use super::{Endpoint, Page, PageCursor, PageSource, blog_identifier, next_offset};
use crate::config::CrawlerConfig;
use crate::error::TransportError;
use crate::model::ApiPost;
use crate::transport::{Transport, TransportRequest};

/// Cursor for the next time-paged request, or `None` at the end.
///
/// `before` is exclusive upstream, so the cursor is set one second past the
/// oldest post and posts sharing that second are fetched again; callers drop
/// them with a [`SeenPosts`]. When a whole page shares one second the cursor
/// steps past it, so every cursor is strictly older than the last.
fn next_before(
    cursor: &PageCursor,
    oldest: Option<i64>,
    received: usize,
    page_size: u32,
) -> Option<PageCursor> {
    if received < page_size as usize {
        return None;
    }
    let oldest = oldest?;
    let inclusive = oldest.saturating_add(1);
    match cursor.before {
        None => Some(cursor.before(inclusive)),
        Some(before) if inclusive < before => Some(cursor.before(inclusive)),
        Some(before) if oldest < before => Some(cursor.before(oldest)),
        Some(_) => None,
    }
}

/// Post ids already returned by a time-paged source.
#[derive(Default)]
struct SeenPosts(Mutex<FxHashSet<u64>>);

impl SeenPosts {
    fn retain_new(&self, posts: &mut Vec<ApiPost>) {
        let mut seen = self.0.lock();
        posts.retain(|p| seen.insert(p.id));
    }
}

#[derive(Debug, Deserialize)]
struct LikesResponse {
    #[serde(default)]
    liked_posts: Vec<ApiPost>,
}

/// Posts a blog has liked, paged backwards by like time.
pub struct LikedFeedSource {
    endpoint: Endpoint,
    blog: String,
    seen: SeenPosts,
}

impl LikedFeedSource {
    pub fn new(transport: Arc<dyn Transport>, config: &CrawlerConfig, name: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, config),
            blog: blog_identifier(name),
            seen: SeenPosts::default(),
        }
    }
}

#[async_trait]
impl PageSource for LikedFeedSource {
    type Record = ApiPost;

    fn page_url(&self, cursor: &PageCursor) -> String {
        let e = &self.endpoint;
        let mut url = format!(
            "{}/v2/blog/{}/likes?api_key={}&limit={}",
            e.api_base,
            self.blog,
            urlencoding::encode(&e.api_key),
            e.page_size
        );
        if let Some(before) = cursor.before {
            url.push_str(&format!("&before={before}"));
        }
        url
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page<ApiPost>, TransportError> {
        let mut response: LikesResponse = self
            .endpoint
            .get_json(TransportRequest::get(self.page_url(cursor)))
            .await?;
        let oldest = response
            .liked_posts
            .iter()
            .map(|p| p.liked_timestamp.unwrap_or(p.timestamp))
            .min();
        let next = next_before(
            cursor,
            oldest,
            response.liked_posts.len(),
            self.endpoint.page_size,
        );
        self.seen.retain_new(&mut response.liked_posts);
        Ok(Page {
            records: response.liked_posts,
            next,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    posts: Vec<ApiPost>,
}

/// Keyword search results, offset-paged through the dashboard service.
pub struct SearchSource {
    endpoint: Endpoint,
    query: String,
}

impl SearchSource {
    pub fn new(transport: Arc<dyn Transport>, config: &CrawlerConfig, query: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, config),
            query: query.to_owned(),
        }
    }
}

#[async_trait]
impl PageSource for SearchSource {
    type Record = ApiPost;

    fn page_url(&self, cursor: &PageCursor) -> String {
        let e = &self.endpoint;
        format!(
            "{}/svc/search/{}?limit={}&offset={}",
            e.service_base,
            urlencoding::encode(&self.query),
            e.page_size,
            cursor.offset
        )
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page<ApiPost>, TransportError> {
        let request = TransportRequest::get(self.page_url(cursor))
            .with_header("X-Requested-With", "XMLHttpRequest");
        let response: SearchResponse = self.endpoint.get_json(request).await?;
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

/// Tag search results, paged backwards by post time.
pub struct TagSearchSource {
    endpoint: Endpoint,
    tag: String,
    seen: SeenPosts,
}

impl TagSearchSource {
    pub fn new(transport: Arc<dyn Transport>, config: &CrawlerConfig, tag: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, config),
            tag: tag.to_owned(),
            seen: SeenPosts::default(),
        }
    }
}

#[async_trait]
impl PageSource for TagSearchSource {
    type Record = ApiPost;

    fn page_url(&self, cursor: &PageCursor) -> String {
        let e = &self.endpoint;
        let mut url = format!(
            "{}/v2/tagged?tag={}&api_key={}&limit={}",
            e.api_base,
            urlencoding::encode(&self.tag),
            urlencoding::encode(&e.api_key),
            e.page_size
        );
        if let Some(before) = cursor.before {
            url.push_str(&format!("&before={before}"));
        }
        url
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page<ApiPost>, TransportError> {
        let mut posts: Vec<ApiPost> = self
            .endpoint
            .get_json(TransportRequest::get(self.page_url(cursor)))
            .await?;
        let oldest = posts.iter().map(|p| p.timestamp).min();
        let next = next_before(cursor, oldest, posts.len(), self.endpoint.page_size);
        self.seen.retain_new(&mut posts);
        Ok(Page {
            records: posts,
            next,
        })
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

    fn post(id: u64, timestamp: i64) -> serde_json::Value {
        json!({
            "id": id,
            "blog_name": "b",
            "type": "photo",
            "post_url": "u",
            "timestamp": timestamp
        })
    }

    #[test]
    fn test_next_before_is_inclusive_and_always_moves() {
        let first = PageCursor::first();
        let next = next_before(&first, Some(100), 2, 2).unwrap();
        assert_eq!(next.before, Some(101));
        // A full page inside one second steps past it.
        let past = next_before(&next, Some(100), 2, 2).unwrap();
        assert_eq!(past.before, Some(100));
        assert!(next_before(&past, Some(100), 2, 2).is_none());
        assert!(next_before(&next, Some(50), 1, 2).is_none());
        assert!(next_before(&first, None, 2, 2).is_none());
    }

    #[tokio::test]
    async fn test_tag_search_pages_by_timestamp() {
        let transport = CannedTransport::default()
            .with(
                "https://api.test/v2/tagged?tag=cute%20cats&api_key=k&limit=2",
                json!({"response": [post(1, 300), post(2, 200)]}),
            )
            .with(
                "https://api.test/v2/tagged?tag=cute%20cats&api_key=k&limit=2&before=201",
                json!({"response": [post(2, 200), post(4, 200)]}),
            )
            .with(
                "https://api.test/v2/tagged?tag=cute%20cats&api_key=k&limit=2&before=200",
                json!({"response": [post(3, 100)]}),
            );
        let source = TagSearchSource::new(Arc::new(transport), &config(), "cute cats");

        let first = source.fetch_page(&PageCursor::first()).await.unwrap();
        let next = first.next.unwrap();
        assert_eq!(next.before, Some(201));

        // Post 4 shares the boundary second with post 2, which is not repeated.
        let second = source.fetch_page(&next).await.unwrap();
        let ids: Vec<_> = second.records.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4]);
        let next = second.next.unwrap();
        assert_eq!(next.before, Some(200));

        let third = source.fetch_page(&next).await.unwrap();
        assert_eq!(third.records.len(), 1);
        assert!(third.next.is_none());
    }

    #[tokio::test]
    async fn test_liked_feed_uses_like_time() {
        let mut liked = post(1, 10);
        liked["liked_timestamp"] = json!(500);
        let transport = CannedTransport::default().with(
            "https://api.test/v2/blog/staff.tumblr.com/likes?api_key=k&limit=2",
            json!({"response": {"liked_count": 2, "liked_posts": [liked, post(2, 20)]}}),
        );
        let source = LikedFeedSource::new(Arc::new(transport), &config(), "staff");
        let page = source.fetch_page(&PageCursor::first()).await.unwrap();
        // post 2 has no like time and falls back to its own timestamp
        assert_eq!(page.next.unwrap().before, Some(21));
    }

    #[tokio::test]
    async fn test_search_missing_page_is_transport_error() {
        let source = SearchSource::new(Arc::new(CannedTransport::default()), &config(), "cats");
        let err = source.fetch_page(&PageCursor::first()).await.err().unwrap();
        assert!(matches!(err, TransportError::NotFound { .. }));
    }
}
