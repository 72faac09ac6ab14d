use std::sync::LazyLock;

use regex::Regex;

use crate::link::{MediaHost, MediaLink};
use crate::parser::MediaLinkParser;

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?gfycat\.com/(?:gifs/detail/|ifr/)?([A-Za-z]+)\b").unwrap()
});

/// Maps gfycat page links to the webm rendition.
#[derive(Debug, Clone, Copy, Default)]
pub struct GfycatParser;

impl MediaLinkParser for GfycatParser {
    fn host(&self) -> MediaHost {
        MediaHost::Gfycat
    }

    fn extract(&self, text: &str) -> Vec<MediaLink> {
        URL_REGEX
            .captures_iter(text)
            .map(|caps| {
                MediaLink::new(
                    format!("https://giant.gfycat.com/{}.webm", &caps[1]),
                    MediaHost::Gfycat,
                )
            })
            .collect()
    }
}
