use std::fmt;

/// Known media hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaHost {
    /// The site's own media CDN.
    Tumblr,
    Imgur,
    Gfycat,
    Webmshare,
    Mixtape,
    Uguu,
    SafeMoe,
    LoliSafe,
    CatBox,
}

impl MediaHost {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tumblr => "tumblr",
            Self::Imgur => "imgur",
            Self::Gfycat => "gfycat",
            Self::Webmshare => "webmshare",
            Self::Mixtape => "mixtape",
            Self::Uguu => "uguu",
            Self::SafeMoe => "safemoe",
            Self::LoliSafe => "lolisafe",
            Self::CatBox => "catbox",
        }
    }

    /// Whether links from this host point off-site.
    pub fn is_third_party(&self) -> bool {
        !matches!(self, Self::Tumblr)
    }
}

impl fmt::Display for MediaHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Other,
}

impl MediaKind {
    /// Guess the kind from the URL's file extension.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let name = path.rsplit('/').next().unwrap_or(path);
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "pnj" | "bmp" => Self::Image,
            "mp4" | "webm" | "gifv" | "mov" | "mkv" => Self::Video,
            "mp3" | "ogg" | "wav" | "m4a" | "flac" => Self::Audio,
            _ => Self::Other,
        }
    }
}

/// A direct download link found in a post body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaLink {
    pub url: String,
    pub host: MediaHost,
    pub kind: MediaKind,
}

impl MediaLink {
    pub fn new(url: impl Into<String>, host: MediaHost) -> Self {
        let url = url.into();
        let kind = MediaKind::from_url(&url);
        Self { url, host, kind }
    }

    /// The last path segment of the URL, without query or fragment.
    pub fn file_name(&self) -> &str {
        let path = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        path.rsplit('/').next().unwrap_or(path)
    }
}
