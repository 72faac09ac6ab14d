//! Remote post records and the content references derived from them.

mod api;
mod svc;

pub use api::{ApiPhoto, ApiPhotoSize, ApiPost};
pub use svc::{SvcBlog, SvcPhoto, SvcPost, SvcReblog};

use media_links::{MediaHost, MediaKind, MediaLink, MediaLinkParserSet};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::ContentFilter;

/// What the crawler needs from a post record to derive downloads.
pub trait PostRecord: Send + Sync + 'static {
    fn post_id(&self) -> String;

    /// Unix timestamp in seconds.
    fn timestamp(&self) -> i64;

    /// Media the post itself carries: photos, video and audio files.
    fn media_urls(&self) -> Vec<String>;

    /// Free-form HTML fragments that may embed links to other hosts.
    fn html_fragments(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Photo,
    Video,
    Audio,
    Other,
}

impl From<MediaKind> for ContentKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::Photo,
            MediaKind::Video => Self::Video,
            MediaKind::Audio => Self::Audio,
            MediaKind::Other => Self::Other,
        }
    }
}

/// One downloadable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub post_id: String,
    pub url: String,
    /// Index key; the remote file name.
    pub id: String,
    /// Local file name.
    pub file_name: String,
    pub kind: ContentKind,
    pub host: MediaHost,
    pub timestamp: i64,
}

impl ContentRef {
    fn from_link(link: &MediaLink, post_id: &str, timestamp: i64) -> Self {
        // Own media keeps the bare file name; other hosts are namespaced so
        // equal names on two hosts stay distinct.
        let id = if link.host.is_third_party() {
            format!("{}/{}", link.host, link.file_name())
        } else {
            link.file_name().to_owned()
        };
        Self {
            post_id: post_id.to_owned(),
            url: link.url.clone(),
            file_name: pipeline_common::sanitize_filename(&id),
            id,
            kind: link.kind.into(),
            host: link.host,
            timestamp,
        }
    }
}

impl ContentFilter {
    pub fn allows(&self, content: &ContentRef) -> bool {
        if content.host.is_third_party() && !self.third_party {
            return false;
        }
        match content.kind {
            ContentKind::Photo => self.photos,
            ContentKind::Video => self.videos,
            ContentKind::Audio => self.audio,
            ContentKind::Other => true,
        }
    }
}

/// Every content item a record points at, own media first, then links
/// found in its HTML. Duplicate URLs are dropped.
pub fn derive_content_refs<R: PostRecord>(
    record: &R,
    parsers: &MediaLinkParserSet,
) -> Vec<ContentRef> {
    let post_id = record.post_id();
    let timestamp = record.timestamp();
    let mut seen = FxHashSet::default();
    let mut refs = Vec::new();

    for url in record.media_urls() {
        if seen.insert(url.clone()) {
            let link = MediaLink::new(url, MediaHost::Tumblr);
            refs.push(ContentRef::from_link(&link, &post_id, timestamp));
        }
    }

    for fragment in record.html_fragments() {
        for link in parsers.extract_all(fragment) {
            if seen.insert(link.url.clone()) {
                refs.push(ContentRef::from_link(&link, &post_id, timestamp));
            }
        }
    }
    refs
}
