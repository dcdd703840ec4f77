//! Repository search with last-request-wins ordering per client session.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use gitreader_api_types::SearchResponse;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::pagination::{page_limit, pagination_view};
use crate::application::providers::{ProviderError, RepositorySearch};
use crate::domain::error::DomainError;
use crate::domain::repository::SearchQuery;

/// Position of one search request within its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub session: String,
    pub seq: u64,
}

/// Sessions remembered before the least recently active one is forgotten.
pub const DEFAULT_SESSION_CAPACITY: usize = 4096;

/// Tracks the newest search issued per session so late responses to
/// superseded searches can be discarded.
///
/// Session ids come from clients, so the table is an LRU bounded by
/// capacity. A forgotten session restarts its numbering; its in-flight
/// tickets then read as stale, which only drops a response nobody is
/// waiting for anymore.
pub struct SearchSequencer {
    latest: Mutex<LruCache<String, u64>>,
}

impl Default for SearchSequencer {
    fn default() -> Self {
        Self::with_capacity(
            NonZeroUsize::new(DEFAULT_SESSION_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        )
    }
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            latest: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Issue the next ticket for `session`.
    pub fn issue(&self, session: &str) -> SearchTicket {
        let mut latest = self.lock();
        let seq = latest.get(session).copied().unwrap_or(0) + 1;
        latest.put(session.to_string(), seq);
        SearchTicket {
            session: session.to_string(),
            seq,
        }
    }

    /// Record a client-numbered request. Older numbers never move the
    /// session backwards.
    pub fn observe(&self, session: &str, seq: u64) -> SearchTicket {
        let mut latest = self.lock();
        let newest = latest.get(session).copied().map_or(seq, |known| known.max(seq));
        latest.put(session.to_string(), newest);
        SearchTicket {
            session: session.to_string(),
            seq,
        }
    }

    pub fn is_latest(&self, ticket: &SearchTicket) -> bool {
        self.lock()
            .peek(&ticket.session)
            .is_some_and(|latest| *latest == ticket.seq)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, u64>> {
        self.latest.lock().unwrap_or_else(|poisoned| {
            warn!(
                target = "application::search",
                "Recovered from poisoned search sequencer lock"
            );
            poisoned.into_inner()
        })
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct SearchService {
    provider: Arc<dyn RepositorySearch>,
    sequencer: SearchSequencer,
    per_page: u32,
}

impl SearchService {
    pub fn new(provider: Arc<dyn RepositorySearch>, per_page: u32) -> Self {
        Self {
            provider,
            sequencer: SearchSequencer::new(),
            per_page,
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn sequencer(&self) -> &SearchSequencer {
        &self.sequencer
    }

    /// Run one search. With a ticket, a response that lost the race to a
    /// newer request from the same session comes back `stale` and empty.
    pub async fn search(
        &self,
        raw_query: &str,
        page: u32,
        ticket: Option<SearchTicket>,
    ) -> Result<SearchResponse, SearchError> {
        let query = SearchQuery::parse(raw_query)?;
        if page == 0 || page > page_limit(self.per_page) {
            return Err(DomainError::PageOutOfRange { page }.into());
        }

        if let Some(ticket) = ticket.as_ref().filter(|t| !self.sequencer.is_latest(t)) {
            return Ok(self.stale_response(&query, page, ticket));
        }

        let result = self.provider.search(&query, page, self.per_page).await;

        if let Some(ticket) = ticket.as_ref().filter(|t| !self.sequencer.is_latest(t)) {
            debug!(
                target = "application::search",
                session = %ticket.session,
                seq = ticket.seq,
                "Discarding superseded search response"
            );
            return Ok(self.stale_response(&query, page, ticket));
        }

        let results = result.inspect_err(|err| {
            counter!("gitreader_upstream_errors_total", "provider" => "search", "kind" => err.kind())
                .increment(1);
            warn!(
                target = "application::search",
                query = query.as_str(),
                page,
                error = %err,
                "Repository search failed"
            );
        })?;

        let pagination = pagination_view(page, results.total_count, self.per_page);
        let reachable = u64::from(pagination.total_pages) * u64::from(self.per_page);

        Ok(SearchResponse {
            query: query.as_str().to_string(),
            total_count: results.total_count,
            incomplete_results: results.incomplete,
            truncated: results.total_count > reachable,
            items: results.items,
            pagination,
            stale: false,
            seq: ticket.map(|ticket| ticket.seq),
        })
    }

    fn stale_response(&self, query: &SearchQuery, page: u32, ticket: &SearchTicket) -> SearchResponse {
        SearchResponse {
            query: query.as_str().to_string(),
            total_count: 0,
            incomplete_results: false,
            truncated: false,
            items: Vec::new(),
            pagination: pagination_view(page, 0, self.per_page),
            stale: true,
            seq: Some(ticket.seq),
        }
    }
}
