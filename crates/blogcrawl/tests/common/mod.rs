#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use blogcrawl_engine::{
    CrawlerConfig, Dispatcher, Index, IndexLoadError, IndexLoader, IndexRegistry, IndexStore,
    Target, Transport, TransportError, TransportFactory, TransportRequest, TransportResponse,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};

pub const API: &str = "https://api.test";
pub const SVC: &str = "https://www.test";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn config(download_dir: &Path) -> CrawlerConfig {
    CrawlerConfig::default()
        .with_download_dir(download_dir)
        .with_api_base(API)
        .with_service_base(SVC)
        .with_api_key("k")
        .with_download_concurrency(1)
}

type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// In-memory site: JSON pages and media files by URL.
#[derive(Default)]
pub struct FakeSite {
    routes: Mutex<FxHashMap<String, Result<String, u16>>>,
    requests: Mutex<Vec<String>>,
    hook: Mutex<Option<Hook>>,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, url: impl Into<String>, body: Value) {
        self.routes.lock().insert(url.into(), Ok(body.to_string()));
    }

    pub fn file(&self, url: impl Into<String>) {
        let url = url.into();
        let body = format!("bytes of {url}");
        self.routes.lock().insert(url, Ok(body));
    }

    pub fn status(&self, url: impl Into<String>, status: u16) {
        self.routes.lock().insert(url.into(), Err(status));
    }

    /// Called with every requested URL before it is answered.
    pub fn on_request(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Arc::new(hook));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transport for FakeSite {
    async fn issue_request(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request.url.clone());
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook(&request.url);
        }
        let route = self.routes.lock().get(&request.url).cloned();
        match route {
            Some(Ok(body)) => Ok(TransportResponse::ok(request.url, body)),
            Some(Err(status)) => Err(TransportError::from_status(status, request.url)),
            None => Err(TransportError::from_status(404, request.url)),
        }
    }
}

/// Hands out one shared [`FakeSite`] and counts how often it was asked.
pub struct FakeFactory {
    pub site: Arc<FakeSite>,
    pub created: AtomicUsize,
}

impl FakeFactory {
    pub fn new(site: Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self {
            site,
            created: AtomicUsize::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl TransportFactory for FakeFactory {
    fn create(&self, _target: &Target) -> Result<Arc<dyn Transport>, TransportError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.site.clone())
    }
}

/// Index store that counts reads and keeps writes in memory.
#[derive(Default)]
pub struct CountingStore {
    pub indices: Mutex<Vec<Index>>,
    pub reads: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl IndexStore for CountingStore {
    fn read_index(&self, target: &Target) -> Result<Option<Index>, IndexLoadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .indices
            .lock()
            .iter()
            .find(|i| i.name == target.name() && i.variant == target.variant)
            .cloned())
    }

    fn enumerate_all(&self) -> Result<Vec<Index>, IndexLoadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.indices.lock().clone())
    }

    fn write_index(&self, index: &Index) -> std::io::Result<()> {
        let mut indices = self.indices.lock();
        indices.retain(|i| !(i.name == index.name && i.variant == index.variant));
        indices.push(index.clone());
        Ok(())
    }
}

pub fn dispatcher(
    config: CrawlerConfig,
    store: Arc<dyn IndexStore>,
    factory: Arc<FakeFactory>,
) -> Dispatcher {
    let registry = if config.load_all_indices {
        IndexRegistry::load(store.as_ref()).expect("registry")
    } else {
        IndexRegistry::empty()
    };
    let load_all = config.load_all_indices;
    Dispatcher::new(
        config,
        IndexLoader::new(store, Arc::new(registry), load_all),
        factory,
    )
    .expect("valid config")
}

pub fn media(name: &str) -> String {
    format!("https://64.media.tumblr.com/ab/{name}")
}

pub fn api_post(id: u64, photo: &str) -> Value {
    json!({
        "id": id,
        "blog_name": "staff",
        "type": "photo",
        "post_url": format!("https://staff.tumblr.com/post/{id}"),
        "timestamp": 1_600_000_000 + id as i64,
        "tags": ["test"],
        "photos": [{"original_size": {"url": media(photo), "width": 500, "height": 400}}]
    })
}

pub fn svc_post(id: &str, photo: &str) -> Value {
    json!({
        "id": id,
        "blog": {"name": "hidden"},
        "type": "photo",
        "post_url": format!("https://hidden.tumblr.com/post/{id}"),
        "timestamp": 1_500_000_000,
        "photos": [{"url": media(photo), "width": 500, "height": 400}]
    })
}

pub fn blog_page_url(name: &str, offset: u64) -> String {
    format!("{API}/v2/blog/{name}.tumblr.com/posts?api_key=k&offset={offset}&limit=20&reblog_info=true")
}

pub fn private_page_url(name: &str, offset: u64) -> String {
    format!(
        "{SVC}/svc/indash_blog?tumblelog_name_or_id={name}&post_id=&limit=20&offset={offset}&should_bypass_safemode=true"
    )
}

pub fn likes_url(name: &str) -> String {
    format!("{API}/v2/blog/{name}.tumblr.com/likes?api_key=k&limit=20")
}

pub fn search_url(query: &str) -> String {
    format!("{SVC}/svc/search/{query}?limit=20&offset=0")
}

pub fn tagged_url(tag: &str) -> String {
    format!("{API}/v2/tagged?tag={tag}&api_key=k&limit=20")
}
