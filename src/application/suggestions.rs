//! Search suggestions: this week's trending repositories, then fixed topics.

use std::sync::Arc;

use gitreader_api_types::{Suggestion, SuggestionKind};
use metrics::counter;
use time::{Date, Duration};
use tracing::warn;

use crate::application::providers::RepositorySearch;

pub const TRENDING_WINDOW_DAYS: i64 = 7;
const TRENDING_FETCH: u32 = 10;
const TRENDING_SHOWN: usize = 8;

pub const POPULAR_QUERIES: [&str; 8] = [
    "react",
    "javascript",
    "typescript",
    "python",
    "machine learning",
    "web development",
    "api",
    "framework",
];

pub struct SuggestionService {
    provider: Arc<dyn RepositorySearch>,
}

impl SuggestionService {
    pub fn new(provider: Arc<dyn RepositorySearch>) -> Self {
        Self { provider }
    }

    /// Suggestions as of `today`, optionally narrowed to those containing
    /// `filter` (case-insensitive). Trending failures fall back to the
    /// popular list alone.
    pub async fn suggestions(&self, today: Date, filter: Option<&str>) -> Vec<Suggestion> {
        let since = today
            .checked_sub(Duration::days(TRENDING_WINDOW_DAYS))
            .unwrap_or(today);

        let trending = match self.provider.trending(since, TRENDING_FETCH).await {
            Ok(repositories) => repositories,
            Err(err) => {
                counter!("gitreader_upstream_errors_total", "provider" => "trending", "kind" => err.kind())
                    .increment(1);
                warn!(
                    target = "application::suggestions",
                    error = %err,
                    "Failed to load trending repositories"
                );
                Vec::new()
            }
        };

        let needle = filter
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        trending
            .into_iter()
            .take(TRENDING_SHOWN)
            .map(|repository| Suggestion {
                query: repository.name,
                kind: SuggestionKind::Trending,
            })
            .chain(POPULAR_QUERIES.iter().map(|query| Suggestion {
                query: (*query).to_string(),
                kind: SuggestionKind::Popular,
            }))
            .filter(|suggestion| match &needle {
                Some(needle) => suggestion.query.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .collect()
    }
}
