//! Metadata rendering strategies.
//!
//! Each record schema is rendered by exactly one strategy per run, chosen
//! from the target's [`MetadataFormat`]. Both strategies preserve the post
//! identifier, the content URLs and the timestamp.

mod json;
mod text;

pub use json::JsonRenderer;
pub use text::TextRenderer;

use std::sync::Arc;

use crate::error::CrawlError;
use crate::target::MetadataFormat;

pub trait MetadataRenderer<R>: Send + Sync {
    fn format(&self) -> MetadataFormat;

    fn render(&self, record: &R) -> Result<Vec<u8>, CrawlError>;
}

/// Strategy for `format`, fixed for the lifetime of a run.
pub fn renderer_for<R: 'static>(format: MetadataFormat) -> Arc<dyn MetadataRenderer<R>>
where
    TextRenderer: MetadataRenderer<R>,
    JsonRenderer: MetadataRenderer<R>,
{
    match format {
        MetadataFormat::Text => Arc::new(TextRenderer),
        MetadataFormat::Json => Arc::new(JsonRenderer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiPost, PostRecord, SvcPost};

    fn api_post() -> ApiPost {
        serde_json::from_value(serde_json::json!({
            "id": 7001,
            "blog_name": "staff",
            "type": "photo",
            "post_url": "https://staff.tumblr.com/post/7001",
            "timestamp": 1_500_000_123,
            "tags": ["cats", "art"],
            "photos": [{"original_size": {"url": "https://64.media.tumblr.com/a/tumblr_x_1280.png"}}],
            "caption": "<p>hi</p>"
        }))
        .unwrap()
    }

    fn svc_post() -> SvcPost {
        serde_json::from_value(serde_json::json!({
            "id": "8002",
            "blog": {"name": "hidden"},
            "type": "video",
            "post_url": "https://hidden.tumblr.com/post/8002",
            "timestamp": 1_400_000_456,
            "video_url": "https://vt.tumblr.com/tumblr_v_720.mp4",
            "post_html": "<p>clip</p>"
        }))
        .unwrap()
    }

    fn assert_preserves_fields<R: PostRecord>(record: &R, rendered: &[u8]) {
        let rendered = String::from_utf8_lossy(rendered);
        assert!(rendered.contains(&record.post_id()), "missing id in {rendered}");
        assert!(rendered.contains(&record.timestamp().to_string()));
        for url in record.media_urls() {
            assert!(rendered.contains(&url), "missing {url} in {rendered}");
        }
    }

    #[test]
    fn test_both_strategies_preserve_identity_urls_and_timestamp() {
        for format in [MetadataFormat::Text, MetadataFormat::Json] {
            let api = api_post();
            let renderer = renderer_for::<ApiPost>(format);
            assert_eq!(renderer.format(), format);
            assert_preserves_fields(&api, &renderer.render(&api).unwrap());

            let svc = svc_post();
            let renderer = renderer_for::<SvcPost>(format);
            assert_preserves_fields(&svc, &renderer.render(&svc).unwrap());
        }
    }

    #[test]
    fn test_json_strategy_is_lossless() {
        let api = api_post();
        let bytes = renderer_for::<ApiPost>(MetadataFormat::Json).render(&api).unwrap();
        assert_eq!(serde_json::from_slice::<ApiPost>(&bytes).unwrap(), api);

        let svc = svc_post();
        let bytes = renderer_for::<SvcPost>(MetadataFormat::Json).render(&svc).unwrap();
        assert_eq!(serde_json::from_slice::<SvcPost>(&bytes).unwrap(), svc);
    }
}
