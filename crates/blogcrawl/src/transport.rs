//! HTTP transport used by every fetch stage.
//!
//! Stages only see the [`Transport`] trait; the dispatcher obtains one
//! instance per run from a [`TransportFactory`], which lets tests substitute
//! in-memory fakes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, trace};

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::target::Target;

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successful response with its full body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub url: String,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn ok(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::decode(&self.url, e))
    }
}

/// Issues requests on behalf of one crawl run.
///
/// Implementations must be safe to call from several stages at once.
/// Non-success status codes are returned as errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue_request(&self, request: TransportRequest)
    -> Result<TransportResponse, TransportError>;
}

/// Creates the transport a pipeline uses.
pub trait TransportFactory: Send + Sync {
    fn create(&self, target: &Target) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Cookies shared by every request of one transport.
#[derive(Debug, Default)]
pub struct SessionCookies {
    cookies: RwLock<BTreeMap<String, String>>,
}

impl SessionCookies {
    /// Parse a `name=value; name2=value2` string. Newlines also separate
    /// cookies so browser exports can be pasted as-is.
    pub fn from_cookie_string(cookie_string: &str) -> Self {
        let jar = Self::default();
        {
            let mut cookies = jar.cookies.write();
            for part in cookie_string.split(&[';', '\n'][..]).map(str::trim) {
                let Some((name, value)) = part.split_once('=') else {
                    continue;
                };
                let (name, value) = (name.trim(), value.trim());
                if name.is_empty() || value.is_empty() {
                    continue;
                }
                cookies.insert(name.to_owned(), value.to_owned());
            }
        }
        jar
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.cookies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.read().is_empty()
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> Option<String> {
        let cookies = self.cookies.read();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Store cookies set by a response.
    pub fn store_from_headers(&self, headers: &HeaderMap) {
        let mut cookies = self.cookies.write();
        for value in headers.get_all("set-cookie").iter() {
            if let Ok(cookie_str) = value.to_str()
                && let Some(cookie_part) = cookie_str.split(';').next()
                && let Some((name, value)) = cookie_part.split_once('=')
            {
                let (name, value) = (name.trim(), value.trim());
                if name.is_empty() || value.is_empty() {
                    continue;
                }
                trace!(cookie = name, "Storing response cookie");
                cookies.insert(name.to_owned(), value.to_owned());
            }
        }
    }
}

/// Build a reqwest client from the transport settings.
pub fn create_client(config: &TransportConfig) -> Result<Client, TransportError> {
    let mut default_headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::Client {
            reason: format!("invalid header name `{name}`: {e}"),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| TransportError::Client {
            reason: format!("invalid value for header `{name}`: {e}"),
        })?;
        default_headers.insert(name, value);
    }

    let mut builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(default_headers)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        builder = builder.timeout(config.timeout);
    }
    if !config.connect_timeout.is_zero() {
        builder = builder.connect_timeout(config.connect_timeout);
    }

    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| TransportError::Client {
            reason: format!("invalid proxy URL `{proxy_url}`: {e}"),
        })?;
        builder = builder.proxy(proxy);
        debug!(proxy_url = %proxy_url, "Using configured proxy");
    }

    builder.build().map_err(|e| TransportError::Client {
        reason: e.to_string(),
    })
}

/// reqwest-backed transport with a per-run cookie jar.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    cookies: Arc<SessionCookies>,
}

impl HttpTransport {
    pub fn new(client: Client, cookies: Arc<SessionCookies>) -> Self {
        Self { client, cookies }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let cookies = config
            .cookies
            .as_deref()
            .map(SessionCookies::from_cookie_string)
            .unwrap_or_default();
        Ok(Self::new(create_client(config)?, Arc::new(cookies)))
    }

    pub fn cookies(&self) -> &Arc<SessionCookies> {
        &self.cookies
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue_request(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = self.cookies.header_value() {
            builder = builder.header(COOKIE, cookie);
        }

        trace!(url = %request.url, "Issuing request");
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::network(&request.url, e))?;

        self.cookies.store_from_headers(response.headers());

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16(), request.url));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::network(&request.url, e))?;
        Ok(TransportResponse {
            status: status.as_u16(),
            url: request.url,
            body,
        })
    }
}

/// Produces one [`HttpTransport`] per run, each with its own cookie jar.
#[derive(Debug, Clone, Default)]
pub struct HttpTransportFactory {
    config: TransportConfig,
}

impl HttpTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self, target: &Target) -> Result<Arc<dyn Transport>, TransportError> {
        debug!(target_name = %target.name(), variant = %target.variant, "Creating HTTP transport");
        Ok(Arc::new(HttpTransport::from_config(&self.config)?))
    }
}
