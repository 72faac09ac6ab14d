use rustc_hash::FxHashSet;
use tracing::trace;

use crate::hosts::{GfycatParser, ImgurParser, TumblrParser, WebmshareParser, direct};
use crate::link::{MediaHost, MediaLink};
use crate::parser::MediaLinkParser;

struct ParserEntry {
    host: MediaHost,
    parser: &'static dyn MediaLinkParser,
}

macro_rules! parser_registry {
    ( $( $host:path => $parser:expr ),+ $(,)? ) => {
        &[
            $(
                ParserEntry {
                    host: $host,
                    parser: &$parser,
                },
            )+
        ]
    };
}

// Static parser registry, in extraction order.
static PARSERS: &[ParserEntry] = parser_registry![
    MediaHost::Tumblr => TumblrParser,
    MediaHost::Imgur => ImgurParser,
    MediaHost::Gfycat => GfycatParser,
    MediaHost::Webmshare => WebmshareParser,
    MediaHost::Mixtape => direct::MIXTAPE,
    MediaHost::Uguu => direct::UGUU,
    MediaHost::SafeMoe => direct::SAFEMOE,
    MediaHost::LoliSafe => direct::LOLISAFE,
    MediaHost::CatBox => direct::CATBOX,
];

/// The fixed set of media-link parsers.
///
/// The set is a view over a static registry; copies are free and every
/// parser in it is reentrant.
#[derive(Clone, Copy)]
pub struct MediaLinkParserSet {
    entries: &'static [ParserEntry],
}

impl std::fmt::Debug for MediaLinkParserSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.host))
            .finish()
    }
}

impl Default for MediaLinkParserSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl MediaLinkParserSet {
    /// Every known host parser.
    pub fn standard() -> Self {
        Self { entries: PARSERS }
    }

    pub fn hosts(&self) -> impl Iterator<Item = MediaHost> + '_ {
        self.entries.iter().map(|e| e.host)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every parser over `text`.
    ///
    /// Links are returned in registry order, then in order of appearance,
    /// with duplicate URLs dropped.
    pub fn extract_all(&self, text: &str) -> Vec<MediaLink> {
        let mut seen = FxHashSet::default();
        let mut links = Vec::new();
        for entry in self.entries {
            for link in entry.parser.extract(text) {
                if seen.insert(link.url.clone()) {
                    links.push(link);
                }
            }
        }
        trace!(found = links.len(), "Extracted media links");
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_registry_covers_every_host_once() {
        let set = MediaLinkParserSet::standard();
        let hosts: Vec<_> = set.hosts().collect();
        let unique: FxHashSet<_> = hosts.iter().copied().collect();
        assert_eq!(hosts.len(), 9);
        assert_eq!(unique.len(), hosts.len());
        for entry in PARSERS {
            assert_eq!(entry.parser.host(), entry.host);
        }
    }

    #[test]
    fn test_extract_all_mixed_body() {
        let body = r#"
            <p>look <img src="https://64.media.tumblr.com/aa/tumblr_1_500.png"></p>
            <a href="https://i.imgur.com/Xy1.jpg">imgur</a>
            <a href="https://i.imgur.com/Xy1.jpg">again</a>
            <a href="https://files.catbox.moe/k9.webm">catbox</a>
        "#;
        let links = MediaLinkParserSet::standard().extract_all(body);
        let hosts: Vec<_> = links.iter().map(|l| l.host).collect();
        assert_eq!(
            hosts,
            vec![MediaHost::Tumblr, MediaHost::Imgur, MediaHost::CatBox]
        );
    }

    #[test]
    fn test_third_party_classification() {
        let body = "https://64.media.tumblr.com/aa/x.png https://a.uguu.se/f.mp4";
        let links = MediaLinkParserSet::standard().extract_all(body);
        let third_party: Vec<_> = links.iter().filter(|l| l.host.is_third_party()).collect();
        assert_eq!(links.len(), 2);
        assert_eq!(third_party.len(), 1);
        assert_eq!(third_party[0].host, MediaHost::Uguu);
    }

    #[test]
    fn test_unknown_host_yields_nothing() {
        let links = MediaLinkParserSet::standard()
            .extract_all(r#"<img src="https://example.org/cat.png"> plain text"#);
        assert!(links.is_empty());
    }

    #[test]
    fn test_set_is_shareable_across_threads() {
        let set = MediaLinkParserSet::standard();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    set.extract_all(&format!("https://i.imgur.com/t{i}.png")).len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
    }

    proptest! {
        #[test]
        fn prop_arbitrary_text_never_panics_and_has_no_duplicates(text in ".{0,400}") {
            let links = MediaLinkParserSet::standard().extract_all(&text);
            let unique: FxHashSet<_> = links.iter().map(|l| l.url.clone()).collect();
            prop_assert_eq!(unique.len(), links.len());
        }
    }
}
