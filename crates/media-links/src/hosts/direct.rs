//! File-drop hosts whose links already point at the file itself.

use std::sync::LazyLock;

use regex::Regex;

use super::collect_matches;
use crate::link::{MediaHost, MediaLink};
use crate::parser::MediaLinkParser;

macro_rules! file_host_regex {
    ($domain:literal) => {
        LazyLock::new(|| {
            Regex::new(concat!(
                r"https?://",
                $domain,
                r"/[\w\-.]+?\.(?:jpe?g|png|gif|webp|mp4|webm|mov|mp3|ogg)"
            ))
            .unwrap()
        })
    };
}

pub static MIXTAPE_REGEX: LazyLock<Regex> = file_host_regex!(r"(?:my\.)?mixtape\.moe");
pub static UGUU_REGEX: LazyLock<Regex> = file_host_regex!(r"a\.uguu\.se");
pub static SAFEMOE_REGEX: LazyLock<Regex> = file_host_regex!(r"a\.safe\.moe");
pub static LOLISAFE_REGEX: LazyLock<Regex> = file_host_regex!(r"loli\.temel\.me");
pub static CATBOX_REGEX: LazyLock<Regex> = file_host_regex!(r"files\.catbox\.moe");

/// Matches direct file links on a single file-drop host.
#[derive(Debug)]
pub struct DirectFileParser {
    host: MediaHost,
    regex: &'static LazyLock<Regex>,
}

impl DirectFileParser {
    pub const fn new(host: MediaHost, regex: &'static LazyLock<Regex>) -> Self {
        Self { host, regex }
    }
}

impl MediaLinkParser for DirectFileParser {
    fn host(&self) -> MediaHost {
        self.host
    }

    fn extract(&self, text: &str) -> Vec<MediaLink> {
        collect_matches(self.regex, text, self.host)
    }
}

pub static MIXTAPE: DirectFileParser = DirectFileParser::new(MediaHost::Mixtape, &MIXTAPE_REGEX);
pub static UGUU: DirectFileParser = DirectFileParser::new(MediaHost::Uguu, &UGUU_REGEX);
pub static SAFEMOE: DirectFileParser = DirectFileParser::new(MediaHost::SafeMoe, &SAFEMOE_REGEX);
pub static LOLISAFE: DirectFileParser =
    DirectFileParser::new(MediaHost::LoliSafe, &LOLISAFE_REGEX);
pub static CATBOX: DirectFileParser = DirectFileParser::new(MediaHost::CatBox, &CATBOX_REGEX);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_host_matches_only_itself() {
        let text = "https://my.mixtape.moe/abcd.webm https://a.uguu.se/x1.mp4 \
                    https://a.safe.moe/y2.png https://loli.temel.me/z3.gif \
                    https://files.catbox.moe/w4.jpg";
        for (parser, expected) in [
            (&MIXTAPE, "https://my.mixtape.moe/abcd.webm"),
            (&UGUU, "https://a.uguu.se/x1.mp4"),
            (&SAFEMOE, "https://a.safe.moe/y2.png"),
            (&LOLISAFE, "https://loli.temel.me/z3.gif"),
            (&CATBOX, "https://files.catbox.moe/w4.jpg"),
        ] {
            let links = parser.extract(text);
            assert_eq!(links.len(), 1, "{}", parser.host());
            assert_eq!(links[0].url, expected);
        }
    }

    #[test]
    fn test_page_without_file_extension_ignored() {
        assert!(CATBOX.extract("https://files.catbox.moe/").is_empty());
    }
}
