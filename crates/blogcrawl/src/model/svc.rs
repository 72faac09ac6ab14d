use serde::{Deserialize, Serialize};

use super::PostRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvcBlog {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvcPhoto {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvcReblog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_html: Option<String>,
}

/// A post as returned by the dashboard service that serves login-only blogs.
///
/// Identifiers are strings and the blog is nested, unlike [`super::ApiPost`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvcPost {
    pub id: String,
    pub blog: SvcBlog,
    #[serde(rename = "type")]
    pub kind: String,
    pub post_url: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reblog: Option<SvcReblog>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<SvcPhoto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl PostRecord for SvcPost {
    fn post_id(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn media_urls(&self) -> Vec<String> {
        self.photos
            .iter()
            .map(|p| p.url.clone())
            .chain(self.video_url.clone())
            .chain(self.audio_url.clone())
            .collect()
    }

    fn html_fragments(&self) -> Vec<&str> {
        let reblog = self.reblog.as_ref();
        [
            self.post_html.as_deref(),
            reblog.and_then(|r| r.comment.as_deref()),
            reblog.and_then(|r| r.tree_html.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
