use std::sync::LazyLock;

use regex::Regex;

use crate::link::{MediaHost, MediaLink};
use crate::parser::MediaLinkParser;

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?webmshare\.com/(?:play/|download/)?(\w+)").unwrap()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct WebmshareParser;

impl MediaLinkParser for WebmshareParser {
    fn host(&self) -> MediaHost {
        MediaHost::Webmshare
    }

    fn extract(&self, text: &str) -> Vec<MediaLink> {
        URL_REGEX
            .captures_iter(text)
            .map(|caps| {
                MediaLink::new(
                    format!("https://s1.webmshare.com/{}.webm", &caps[1]),
                    MediaHost::Webmshare,
                )
            })
            .collect()
    }
}
