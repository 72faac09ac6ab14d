//! Crawl targets and their raw configuration form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// The five kinds of crawl target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetVariant {
    /// A blog readable through the public API.
    PublicBlog,
    /// A login-only blog read through the dashboard service.
    PrivateBlog,
    /// The posts a blog has liked.
    LikedFeed,
    /// Keyword search results.
    SearchResults,
    /// Tag search results.
    TagSearchResults,
}

impl TargetVariant {
    pub const ALL: [TargetVariant; 5] = [
        Self::PublicBlog,
        Self::PrivateBlog,
        Self::LikedFeed,
        Self::SearchResults,
        Self::TagSearchResults,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicBlog => "public-blog",
            Self::PrivateBlog => "private-blog",
            Self::LikedFeed => "liked-feed",
            Self::SearchResults => "search-results",
            Self::TagSearchResults => "tag-search-results",
        }
    }

    /// Blogs run a separate metadata stage and therefore a second queue.
    pub fn has_metadata_stage(&self) -> bool {
        matches!(self, Self::PublicBlog | Self::PrivateBlog)
    }

    /// Number of work queues the assembled pipeline owns.
    pub fn queue_count(&self) -> usize {
        if self.has_metadata_stage() { 2 } else { 1 }
    }

    /// Suffix of the index file name for this variant.
    pub fn index_suffix(&self) -> &'static str {
        match self {
            Self::PublicBlog => "tumblr",
            Self::PrivateBlog => "tmblrpriv",
            Self::LikedFeed => "tlb",
            Self::SearchResults => "tumblrsearch",
            Self::TagSearchResults => "tumblrtagsearch",
        }
    }

    pub fn from_index_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.index_suffix() == suffix)
    }
}

impl fmt::Display for TargetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetVariant {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| ConfigurationError::UnsupportedTarget(s.to_string()))
    }
}

/// How post metadata is rendered to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataFormat {
    /// Line-oriented `Key: value` text.
    #[default]
    Text,
    /// Structured JSON.
    #[serde(alias = "structured")]
    Json,
}

impl MetadataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" | "structured" => Ok(Self::Json),
            _ => Err(ConfigurationError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Stable identity of a target.
///
/// For blogs and liked feeds `name` is the blog name; for searches it is the
/// query or tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetIdentity {
    pub name: String,
    #[serde(default)]
    pub id: u64,
}

impl TargetIdentity {
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// A validated crawl target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub variant: TargetVariant,
    pub identity: TargetIdentity,
    pub metadata_format: MetadataFormat,
}

impl Target {
    pub fn new(variant: TargetVariant, identity: TargetIdentity) -> Self {
        Self {
            variant,
            identity,
            metadata_format: MetadataFormat::default(),
        }
    }

    pub fn with_metadata_format(mut self, format: MetadataFormat) -> Self {
        self.metadata_format = format;
        self
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Validate a raw configuration entry.
    pub fn from_config(config: &TargetConfig) -> Result<Self, ConfigurationError> {
        let variant: TargetVariant = config.variant.parse()?;
        let metadata_format = match config.metadata_format.as_deref() {
            Some(raw) => raw.parse()?,
            None => MetadataFormat::default(),
        };

        let name = config.name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::invalid_target(
                &config.name,
                "name must not be empty",
            ));
        }
        if matches!(
            variant,
            TargetVariant::PublicBlog | TargetVariant::PrivateBlog | TargetVariant::LikedFeed
        ) && !is_valid_blog_name(name)
        {
            return Err(ConfigurationError::invalid_target(
                name,
                "blog names may only contain letters, digits, '-' and '.'",
            ));
        }

        Ok(Self {
            variant,
            identity: TargetIdentity::new(name, config.id),
            metadata_format,
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity.name, self.variant)
    }
}

fn is_valid_blog_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// A target as written in configuration, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    #[serde(default)]
    pub id: u64,
    pub variant: String,
    #[serde(default)]
    pub metadata_format: Option<String>,
}

impl TargetConfig {
    pub fn new(name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: 0,
            variant: variant.into(),
            metadata_format: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_metadata_format(mut self, format: impl Into<String>) -> Self {
        self.metadata_format = Some(format.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parse_roundtrip() {
        for variant in TargetVariant::ALL {
            assert_eq!(variant.as_str().parse::<TargetVariant>().unwrap(), variant);
        }
        assert_eq!(
            "Tag_Search_Results".parse::<TargetVariant>().unwrap(),
            TargetVariant::TagSearchResults
        );
    }

    #[test]
    fn test_queue_counts() {
        assert_eq!(TargetVariant::PublicBlog.queue_count(), 2);
        assert_eq!(TargetVariant::PrivateBlog.queue_count(), 2);
        assert_eq!(TargetVariant::LikedFeed.queue_count(), 1);
        assert_eq!(TargetVariant::SearchResults.queue_count(), 1);
        assert_eq!(TargetVariant::TagSearchResults.queue_count(), 1);
    }

    #[test]
    fn test_index_suffixes_are_unique() {
        for variant in TargetVariant::ALL {
            assert_eq!(
                TargetVariant::from_index_suffix(variant.index_suffix()),
                Some(variant)
            );
        }
    }

    #[test]
    fn test_from_config_rejects_unknown_variant() {
        let err = Target::from_config(&TargetConfig::new("blog", "archive")).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedTarget(v) if v == "archive"));
    }

    #[test]
    fn test_from_config_rejects_unknown_format() {
        let config = TargetConfig::new("blog", "public-blog").with_metadata_format("xml");
        let err = Target::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedFormat(v) if v == "xml"));
    }

    #[test]
    fn test_from_config_accepts_structured_alias() {
        let config = TargetConfig::new("blog", "private-blog").with_metadata_format("structured");
        let target = Target::from_config(&config).unwrap();
        assert_eq!(target.metadata_format, MetadataFormat::Json);
        assert_eq!(target.variant, TargetVariant::PrivateBlog);
    }

    #[test]
    fn test_from_config_validates_blog_names() {
        assert!(Target::from_config(&TargetConfig::new("bad name", "public-blog")).is_err());
        assert!(Target::from_config(&TargetConfig::new("  ", "search-results")).is_err());
        // Search queries may contain spaces.
        let target =
            Target::from_config(&TargetConfig::new("cute cats", "search-results")).unwrap();
        assert_eq!(target.name(), "cute cats");
    }

    #[test]
    fn test_target_config_deserializes() {
        let config: TargetConfig =
            serde_json::from_str(r#"{"name":"staff","variant":"liked-feed"}"#).unwrap();
        assert_eq!(config.id, 0);
        assert!(config.metadata_format.is_none());
    }
}
