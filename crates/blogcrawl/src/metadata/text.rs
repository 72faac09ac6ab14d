use std::fmt::Write;

use chrono::DateTime;

use super::MetadataRenderer;
use crate::error::CrawlError;
use crate::model::{ApiPost, SvcPost};
use crate::target::MetadataFormat;

/// Line-oriented `Key: value` text, one record per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

/// Collects `Key: value` lines, skipping empty values.
struct Lines(String);

impl Lines {
    fn new() -> Self {
        Self(String::new())
    }

    fn field(&mut self, key: &str, value: impl std::fmt::Display) -> &mut Self {
        let _ = writeln!(self.0, "{key}: {value}");
        self
    }

    fn optional(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            // Keep one record per line group.
            self.field(key, value.replace(['\r', '\n'], " "));
        }
        self
    }

    fn list(&mut self, key: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            self.field(key, values.join(", "));
        }
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.0.push('\n');
        self.0.into_bytes()
    }
}

fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S GMT").to_string())
        .unwrap_or_default()
}

impl MetadataRenderer<ApiPost> for TextRenderer {
    fn format(&self) -> MetadataFormat {
        MetadataFormat::Text
    }

    fn render(&self, post: &ApiPost) -> Result<Vec<u8>, CrawlError> {
        let mut lines = Lines::new();
        lines
            .field("Post ID", post.id)
            .field("Blog", &post.blog_name)
            .field("Type", &post.post_type)
            .field("Post URL", &post.post_url)
            .field("Timestamp", post.timestamp)
            .field(
                "Date",
                post.date.clone().unwrap_or_else(|| format_date(post.timestamp)),
            )
            .optional("Slug", post.slug.as_deref())
            .optional("Reblog Key", post.reblog_key.as_deref())
            .optional("Title", post.title.as_deref());
        for photo in &post.photos {
            lines.field("Photo URL", &photo.original_size.url);
        }
        lines
            .optional("Video URL", post.video_url.as_deref())
            .optional("Audio URL", post.audio_url.as_deref())
            .optional("Caption", post.caption.as_deref())
            .optional("Body", post.body.as_deref())
            .optional("Quote", post.text.as_deref())
            .optional("Source", post.source.as_deref())
            .list("Tags", &post.tags);
        Ok(lines.finish())
    }
}

impl MetadataRenderer<SvcPost> for TextRenderer {
    fn format(&self) -> MetadataFormat {
        MetadataFormat::Text
    }

    fn render(&self, post: &SvcPost) -> Result<Vec<u8>, CrawlError> {
        let mut lines = Lines::new();
        lines
            .field("Post ID", &post.id)
            .field("Blog", &post.blog.name)
            .field("Type", &post.kind)
            .field("Post URL", &post.post_url)
            .field("Timestamp", post.timestamp)
            .field("Date", format_date(post.timestamp))
            .optional("Summary", post.summary.as_deref());
        for photo in &post.photos {
            lines.field("Photo URL", &photo.url);
        }
        lines
            .optional("Video URL", post.video_url.as_deref())
            .optional("Audio URL", post.audio_url.as_deref())
            .optional("Body", post.post_html.as_deref());
        if let Some(reblog) = &post.reblog {
            lines.optional("Reblog Comment", reblog.comment.as_deref());
        }
        lines.list("Tags", &post.tags);
        Ok(lines.finish())
    }
}
