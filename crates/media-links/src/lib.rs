//! # Media Links
//!
//! Stateless extractors that find direct media download links in post bodies.
//! Each parser understands exactly one hosting pattern: the site's own inline
//! media, or one of the third-party image/video hosts posts commonly embed.
//!
//! The full set is a static registry ([`MediaLinkParserSet::standard`]) that
//! is cheap to copy and safe to share between concurrently running crawls.
//!
//! ```
//! use media_links::{MediaHost, MediaLinkParserSet};
//!
//! let set = MediaLinkParserSet::standard();
//! let links = set.extract_all(r#"<img src="https://i.imgur.com/AbC12.png">"#);
//! assert_eq!(links.len(), 1);
//! assert_eq!(links[0].host, MediaHost::Imgur);
//! ```

mod hosts;
mod link;
mod parser;
mod registry;

pub use hosts::{GfycatParser, ImgurParser, TumblrParser, WebmshareParser, direct};
pub use link::{MediaHost, MediaKind, MediaLink};
pub use parser::MediaLinkParser;
pub use registry::MediaLinkParserSet;
