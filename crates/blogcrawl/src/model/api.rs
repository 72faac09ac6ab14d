use serde::{Deserialize, Serialize};

use super::PostRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPhotoSize {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPhoto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub original_size: ApiPhotoSize,
}

/// A post as returned by the public API and the search endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPost {
    pub id: u64,
    pub blog_name: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub post_url: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reblog_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<ApiPhoto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_count: Option<u64>,
    /// Set on liked-feed entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked_timestamp: Option<i64>,
}

impl PostRecord for ApiPost {
    fn post_id(&self) -> String {
        self.id.to_string()
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn media_urls(&self) -> Vec<String> {
        self.photos
            .iter()
            .map(|p| p.original_size.url.clone())
            .chain(self.video_url.clone())
            .chain(self.audio_url.clone())
            .collect()
    }

    fn html_fragments(&self) -> Vec<&str> {
        [&self.body, &self.caption, &self.text, &self.source]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .chain(self.photos.iter().filter_map(|p| p.caption.as_deref()))
            .collect()
    }
}
