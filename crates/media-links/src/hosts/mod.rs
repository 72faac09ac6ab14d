pub mod direct;
mod gfycat;
mod imgur;
mod tumblr;
mod webmshare;

pub use gfycat::GfycatParser;
pub use imgur::ImgurParser;
pub use tumblr::TumblrParser;
pub use webmshare::WebmshareParser;

use regex::Regex;

use crate::link::{MediaHost, MediaLink};

/// Collect every full match of `re` in `text` as a link for `host`.
pub(crate) fn collect_matches(re: &Regex, text: &str, host: MediaHost) -> Vec<MediaLink> {
    re.find_iter(text)
        .map(|m| MediaLink::new(m.as_str(), host))
        .collect()
}
