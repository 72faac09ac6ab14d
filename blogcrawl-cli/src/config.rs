use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blogcrawl_engine::config::{DEFAULT_API_BASE, DEFAULT_SERVICE_BASE, DEFAULT_USER_AGENT};
use blogcrawl_engine::{ContentFilter, CrawlerConfig, TargetConfig, TransportConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

const CONFIG_DIR: &str = "blogcrawl";
const CONFIG_FILE: &str = "config.toml";

/// Everything the CLI reads from its TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub download_dir: PathBuf,
    /// Where index files live; `<download_dir>/index` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_dir: Option<PathBuf>,
    pub load_all_indices: bool,
    pub api_key: String,
    pub api_base: String,
    pub service_base: String,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    pub download_concurrency: usize,
    pub fatal_auth_failures: u32,
    pub filter: FilterSection,
    pub http: HttpSection,
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    pub photos: bool,
    pub videos: bool,
    pub audio: bool,
    pub third_party: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub follow_redirects: bool,
    pub headers: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let crawler = CrawlerConfig::default();
        Self {
            download_dir: crawler.download_dir,
            index_dir: None,
            load_all_indices: crawler.load_all_indices,
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_owned(),
            service_base: DEFAULT_SERVICE_BASE.to_owned(),
            page_size: crawler.page_size,
            max_pages: None,
            download_concurrency: crawler.download_concurrency,
            fatal_auth_failures: crawler.fatal_auth_failures,
            filter: FilterSection::default(),
            http: HttpSection::default(),
            targets: Vec::new(),
        }
    }
}

impl Default for FilterSection {
    fn default() -> Self {
        let filter = ContentFilter::default();
        Self {
            photos: filter.photos,
            videos: filter.videos,
            audio: filter.audio,
            third_party: filter.third_party,
        }
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            timeout_secs: transport.timeout.as_secs(),
            connect_timeout_secs: transport.connect_timeout.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            cookies: None,
            proxy: None,
            follow_redirects: transport.follow_redirects,
            headers: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// `<config dir>/blogcrawl/config.toml`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::ConfigNotFound(path.to_path_buf()));
                }
                Self::read(path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// The configuration as TOML.
    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| self.download_dir.join("index"))
    }

    pub fn crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig::default()
            .with_download_dir(&self.download_dir)
            .with_load_all_indices(self.load_all_indices)
            .with_api_key(&self.api_key)
            .with_api_base(&self.api_base)
            .with_service_base(&self.service_base)
            .with_page_size(self.page_size)
            .with_max_pages(self.max_pages)
            .with_download_concurrency(self.download_concurrency)
            .with_fatal_auth_failures(self.fatal_auth_failures)
            .with_content_filter(ContentFilter {
                photos: self.filter.photos,
                videos: self.filter.videos,
                audio: self.filter.audio,
                third_party: self.filter.third_party,
            })
    }

    pub fn transport_config(&self) -> TransportConfig {
        let http = &self.http;
        let mut config = TransportConfig::default()
            .with_timeout(Duration::from_secs(http.timeout_secs))
            .with_connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .with_user_agent(&http.user_agent);
        config.follow_redirects = http.follow_redirects;
        for (name, value) in &http.headers {
            config = config.with_header(name, value);
        }
        if let Some(cookies) = &http.cookies {
            config = config.with_cookies(cookies);
        }
        if let Some(proxy) = &http.proxy {
            config = config.with_proxy(proxy);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
download_dir = "/data/blogs"
api_key = "abc"
load_all_indices = true
download_concurrency = 8

[filter]
audio = false

[http]
cookies = "sid=1; pfg=2"
headers = { "Accept-Language" = "en" }

[[targets]]
name = "staff"
variant = "public-blog"
metadata_format = "json"

[[targets]]
name = "cats"
variant = "tag-search-results"
"#;

    #[test]
    fn test_parse_sample() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/data/blogs"));
        assert_eq!(config.index_dir(), PathBuf::from("/data/blogs/index"));
        assert_eq!(config.page_size, 20);
        assert!(!config.filter.audio);
        assert!(config.filter.photos);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].metadata_format.as_deref(), Some("json"));
        assert_eq!(config.targets[1].variant, "tag-search-results");

        let crawler = config.crawler_config();
        assert!(crawler.load_all_indices);
        assert_eq!(crawler.download_concurrency, 8);
        assert!(!crawler.content_filter.audio);
        crawler.validate().unwrap();

        let transport = config.transport_config();
        assert_eq!(transport.cookies.as_deref(), Some("sid=1; pfg=2"));
        assert_eq!(
            transport.headers,
            vec![("Accept-Language".to_owned(), "en".to_owned())]
        );
        assert_eq!(transport.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_show_round_trips() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        let shown = config.show().unwrap();
        let reparsed: AppConfig = toml::from_str(&shown).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            AppConfig::load(Some(&missing)),
            Err(AppError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_bad_toml_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_size = \"many\"").unwrap();
        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
