use std::sync::LazyLock;

use regex::Regex;

use super::collect_matches;
use crate::link::{MediaHost, MediaLink};
use crate::parser::MediaLinkParser;

/// Inline photos, videos and audio served from the site's own CDN.
pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(?:(?:\d+\.)?media\.tumblr\.com/[\w\-/]+\.(?:jpe?g|png|gif|gifv|webp|pnj|mp4)|(?:vt|ve|va|a)\.tumblr\.com/[\w\-/]+\.(?:mp4|mp3))",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct TumblrParser;

impl MediaLinkParser for TumblrParser {
    fn host(&self) -> MediaHost {
        MediaHost::Tumblr
    }

    fn extract(&self, text: &str) -> Vec<MediaLink> {
        collect_matches(&URL_REGEX, text, MediaHost::Tumblr)
    }
}
