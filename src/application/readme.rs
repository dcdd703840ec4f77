//! README retrieval and rendering for repository cards.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use gitreader_api_types::Theme;
use lru::LruCache;
use metrics::counter;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::providers::{ProviderError, ReadmeSource};
use crate::application::render::{RenderRequest, RenderService, RenderedDocument};
use crate::domain::repository::RepositoryRef;

/// Tracks repositories that currently have a README fetch outstanding.
#[derive(Default, Clone)]
pub struct InFlightReadmes {
    repositories: Arc<DashMap<String, ()>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InFlightError {
    #[error("README fetch already in progress for {repository}")]
    AlreadyRunning { repository: String },
}

impl InFlightReadmes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, repository: &RepositoryRef) -> Result<ReadmeGuard, InFlightError> {
        let key = repository.to_string().to_ascii_lowercase();
        match self.repositories.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(ReadmeGuard {
                    key,
                    repositories: Arc::clone(&self.repositories),
                })
            }
            Entry::Occupied(_) => Err(InFlightError::AlreadyRunning {
                repository: repository.to_string(),
            }),
        }
    }

    pub fn is_running(&self, repository: &RepositoryRef) -> bool {
        self.repositories
            .contains_key(&repository.to_string().to_ascii_lowercase())
    }
}

/// Releases the repository slot when dropped, including on early return.
pub struct ReadmeGuard {
    key: String,
    repositories: Arc<DashMap<String, ()>>,
}

impl Drop for ReadmeGuard {
    fn drop(&mut self) {
        self.repositories.remove(&self.key);
    }
}

const CACHE_SOURCE: &str = "application::readme::cache";

/// Rendered documents keyed by a digest of their inputs.
pub struct RenderCache {
    entries: Option<Mutex<LruCache<String, RenderedDocument>>>,
}

impl RenderCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn key(request: &RenderRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.theme.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(request.base_url.as_deref().unwrap_or("").as_bytes());
        hasher.update([0]);
        hasher.update(request.markdown.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<RenderedDocument> {
        let entries = self.entries.as_ref()?;
        lock(entries, "get").get(key).cloned()
    }

    pub fn insert(&self, key: String, document: RenderedDocument) {
        if let Some(entries) = self.entries.as_ref() {
            lock(entries, "insert").put(key, document);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map(|entries| lock(entries, "len").len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = CACHE_SOURCE,
            result = "poisoned_recovered",
            "Recovered from poisoned render cache lock"
        );
        poisoned.into_inner()
    })
}

#[derive(Debug, Error)]
pub enum ReadmeError {
    #[error(transparent)]
    InFlight(#[from] InFlightError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct ReadmeService {
    source: Arc<dyn ReadmeSource>,
    renderer: Arc<dyn RenderService>,
    cache: RenderCache,
    in_flight: InFlightReadmes,
}

impl ReadmeService {
    pub fn new(
        source: Arc<dyn ReadmeSource>,
        renderer: Arc<dyn RenderService>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            source,
            renderer,
            cache: RenderCache::new(cache_capacity),
            in_flight: InFlightReadmes::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlightReadmes {
        &self.in_flight
    }

    /// Fetch and render one repository's README. A second call for the same
    /// repository while the first is still fetching is rejected.
    pub async fn readme(
        &self,
        repository: &RepositoryRef,
        theme: Theme,
    ) -> Result<RenderedDocument, ReadmeError> {
        let _guard = self.in_flight.acquire(repository)?;

        let fetched = self
            .source
            .fetch_readme(repository)
            .await
            .inspect_err(|err| {
                if !matches!(err, ProviderError::NotFound) {
                    counter!("gitreader_upstream_errors_total", "provider" => "readme", "kind" => err.kind())
                        .increment(1);
                }
            })?;

        let mut request = RenderRequest::new(fetched.markdown, theme);
        if let Some(base_url) = fetched.base_url {
            request = request.with_base_url(base_url);
        }

        debug!(
            target = "application::readme",
            repository = %repository,
            bytes = request.markdown.len(),
            "Rendering README"
        );
        Ok(self.render(&request))
    }

    /// Render through the cache.
    pub fn render(&self, request: &RenderRequest) -> RenderedDocument {
        let key = RenderCache::key(request);
        if let Some(document) = self.cache.get(&key) {
            counter!("gitreader_render_cache_hits_total").increment(1);
            return document;
        }

        counter!("gitreader_render_cache_misses_total").increment(1);
        let document = self.renderer.render_request(request);
        self.cache.insert(key, document.clone());
        document
    }
}
