use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigurationError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

pub const DEFAULT_API_BASE: &str = "https://api.tumblr.com";
pub const DEFAULT_SERVICE_BASE: &str = "https://www.tumblr.com";

/// Which content kinds are downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFilter {
    pub photos: bool,
    pub videos: bool,
    pub audio: bool,
    /// Links to third-party hosts found in post bodies.
    pub third_party: bool,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self {
            photos: true,
            videos: true,
            audio: true,
            third_party: true,
        }
    }
}

/// Settings shared by every pipeline a dispatcher assembles.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Root directory; each target writes below `<download_dir>/<name>`.
    pub download_dir: PathBuf,

    /// Resolve indices through a registry built once from every stored index
    /// instead of reading one index per target.
    pub load_all_indices: bool,

    /// Records requested per page.
    pub page_size: u32,

    /// Stop paging after this many pages.
    pub max_pages: Option<u32>,

    /// Concurrent content downloads per target.
    pub download_concurrency: usize,

    /// Consecutive authentication failures tolerated before a run is aborted.
    pub fatal_auth_failures: u32,

    /// Public API base URL.
    pub api_base: String,

    /// Dashboard service base URL, used for private blogs and search.
    pub service_base: String,

    /// Public API consumer key.
    pub api_key: String,

    pub content_filter: ContentFilter,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            load_all_indices: false,
            page_size: 20,
            max_pages: None,
            download_concurrency: 4,
            fatal_auth_failures: 1,
            api_base: DEFAULT_API_BASE.to_owned(),
            service_base: DEFAULT_SERVICE_BASE.to_owned(),
            api_key: String::new(),
            content_filter: ContentFilter::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_load_all_indices(mut self, load_all: bool) -> Self {
        self.load_all_indices = load_all;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_download_concurrency(mut self, concurrency: usize) -> Self {
        self.download_concurrency = concurrency;
        self
    }

    pub fn with_fatal_auth_failures(mut self, failures: u32) -> Self {
        self.fatal_auth_failures = failures;
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_service_base(mut self, base: impl Into<String>) -> Self {
        self.service_base = base.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_content_filter(mut self, filter: ContentFilter) -> Self {
        self.content_filter = filter;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.page_size == 0 {
            return Err(ConfigurationError::invalid_setting(
                "page_size",
                "must be at least 1",
            ));
        }
        if self.download_concurrency == 0 {
            return Err(ConfigurationError::invalid_setting(
                "download_concurrency",
                "must be at least 1",
            ));
        }
        if self.fatal_auth_failures == 0 {
            return Err(ConfigurationError::invalid_setting(
                "fatal_auth_failures",
                "must be at least 1",
            ));
        }
        for (key, base) in [("api_base", &self.api_base), ("service_base", &self.service_base)] {
            url::Url::parse(base)
                .map_err(|e| ConfigurationError::invalid_setting(key, e.to_string()))?;
        }
        Ok(())
    }

    /// Directory a target's files are written to.
    pub fn target_dir(&self, name: &str) -> PathBuf {
        self.download_dir
            .join(pipeline_common::sanitize_filename(name))
    }
}

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Overall timeout per request; zero disables it.
    pub timeout: Duration,

    pub connect_timeout: Duration,

    pub user_agent: String,

    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,

    /// Initial session cookies, as a `name=value; name2=value2` string.
    pub cookies: Option<String>,

    /// Proxy URL applied to all schemes.
    pub proxy: Option<String>,

    pub follow_redirects: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: Vec::new(),
            cookies: None,
            proxy: None,
            follow_redirects: true,
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}
