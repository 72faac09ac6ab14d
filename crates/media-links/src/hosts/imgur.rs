use std::sync::LazyLock;

use regex::Regex;

use crate::link::{MediaHost, MediaLink};
use crate::parser::MediaLinkParser;

/// Direct imgur media. Album pages need an API round trip and are not matched.
pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://i\.imgur\.com/(\w+)\.(jpe?g|png|gif|gifv|mp4|webm)").unwrap()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct ImgurParser;

impl MediaLinkParser for ImgurParser {
    fn host(&self) -> MediaHost {
        MediaHost::Imgur
    }

    fn extract(&self, text: &str) -> Vec<MediaLink> {
        URL_REGEX
            .captures_iter(text)
            .map(|caps| {
                let id = &caps[1];
                // gifv is an HTML wrapper around the mp4
                let ext = match &caps[2] {
                    "gifv" => "mp4",
                    other => other,
                };
                MediaLink::new(format!("https://i.imgur.com/{id}.{ext}"), MediaHost::Imgur)
            })
            .collect()
    }
}
