//! GitHub REST client backing repository search, trending and README lookups.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use gitreader_api_types::RepositorySummary;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER},
};
use serde::{Deserialize, de::DeserializeOwned};
use time::{Date, OffsetDateTime, macros::format_description};
use tracing::debug;
use url::Url;

use crate::application::providers::{
    ProviderError, ReadmeDocument, ReadmeSource, RepositorySearch,
};
use crate::config::GithubSettings;
use crate::domain::repository::{RepositoryRef, SearchPage, SearchQuery};

use super::error::InfraError;

const GITHUB_JSON: &str = "application/vnd.github.v3+json";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: Url,
    raw_base: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    total_count: u64,
    #[serde(default)]
    incomplete_results: bool,
    #[serde(default)]
    items: Vec<RepositorySummary>,
}

#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl GitHubClient {
    pub fn new(settings: &GithubSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::upstream("github", err.to_string()))?;

        Ok(Self {
            client,
            api_base: settings.api_base.clone(),
            raw_base: settings.raw_base.clone(),
            token: settings.token.clone(),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut url = self.api_base.join(path).map_err(ProviderError::network)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        debug!(target = "gitreader::github", url = %url, "GitHub request");

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        if let Some(token) = self.token.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(ProviderError::network)?;
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(ProviderError::network)?;
        let status = response.status();
        if !status.is_success() {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            return Err(status_error(status, response.headers(), now));
        }

        let bytes = response.bytes().await.map_err(ProviderError::network)?;
        serde_json::from_slice(&bytes).map_err(ProviderError::decode)
    }

    fn fallback_base(&self, repository: &RepositoryRef) -> Option<String> {
        self.raw_base
            .join(&format!("{}/{}/HEAD/", repository.owner(), repository.name()))
            .ok()
            .map(String::from)
    }
}

#[async_trait]
impl RepositorySearch for GitHubClient {
    async fn search(
        &self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ProviderError> {
        let url = self.endpoint(
            "search/repositories",
            &[
                ("q", query.as_str().to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
            ],
        )?;

        let envelope: SearchEnvelope = self.get_json(url).await?;
        Ok(SearchPage {
            items: envelope.items,
            total_count: envelope.total_count,
            incomplete: envelope.incomplete_results,
        })
    }

    async fn trending(
        &self,
        since: Date,
        limit: u32,
    ) -> Result<Vec<RepositorySummary>, ProviderError> {
        let url = self.endpoint(
            "search/repositories",
            &[
                ("q", trending_query(since)?),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
                ("per_page", limit.to_string()),
            ],
        )?;

        let envelope: SearchEnvelope = self.get_json(url).await?;
        Ok(envelope.items)
    }
}

#[async_trait]
impl ReadmeSource for GitHubClient {
    async fn fetch_readme(
        &self,
        repository: &RepositoryRef,
    ) -> Result<ReadmeDocument, ProviderError> {
        let url = self.endpoint(
            &format!("repos/{}/{}/readme", repository.owner(), repository.name()),
            &[],
        )?;
        let envelope: ContentEnvelope = self.get_json(url).await?;

        if let Some(encoding) = envelope.encoding.as_deref() {
            if !encoding.eq_ignore_ascii_case("base64") {
                return Err(ProviderError::decode(format!(
                    "unsupported README encoding `{encoding}`"
                )));
            }
        }

        let markdown = decode_content(&envelope.content)?;
        let base_url = envelope
            .download_url
            .as_deref()
            .and_then(parent_url)
            .or_else(|| self.fallback_base(repository));

        Ok(ReadmeDocument { markdown, base_url })
    }
}

fn trending_query(since: Date) -> Result<String, ProviderError> {
    let day = since
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(ProviderError::decode)?;
    Ok(format!("created:>{day}"))
}

/// Decode the base64 `content` field of a contents API payload. GitHub wraps
/// the encoded text at 60 columns. Invalid UTF-8 becomes U+FFFD.
pub(crate) fn decode_content(content: &str) -> Result<String, ProviderError> {
    let compact: String = content
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact).map_err(ProviderError::decode)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Directory containing `download_url`, with a trailing slash.
pub(crate) fn parent_url(download_url: &str) -> Option<String> {
    let url = Url::parse(download_url).ok()?;
    url.join("./").ok().map(String::from)
}

pub(crate) fn status_error(status: StatusCode, headers: &HeaderMap, now_unix: i64) -> ProviderError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after: retry_after_secs(headers, now_unix),
        },
        StatusCode::NOT_FOUND => ProviderError::NotFound,
        other => ProviderError::Failed {
            status: other.as_u16(),
        },
    }
}

fn retry_after_secs(headers: &HeaderMap, now_unix: i64) -> Option<u64> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
    };

    if let Some(seconds) = header(RETRY_AFTER.as_str()) {
        return u64::try_from(seconds).ok();
    }
    header(RATE_LIMIT_RESET)
        .map(|reset| reset.saturating_sub(now_unix).max(0))
        .and_then(|seconds| u64::try_from(seconds).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use time::macros::date;

    #[test]
    fn decodes_wrapped_base64() {
        let encoded = "IyBIZWxs\nbyB3b3Js\nZA==\n";
        assert_eq!(decode_content(encoded).expect("decode"), "# Hello world");
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        assert!(matches!(
            decode_content("not*base64"),
            Err(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let encoded = STANDARD.encode(b"# Caf\xe9\n\nSome docs");
        let decoded = decode_content(&encoded).expect("lossy decode");
        assert_eq!(decoded, "# Caf\u{FFFD}\n\nSome docs");
    }

    #[test]
    fn parent_url_strips_file_name() {
        assert_eq!(
            parent_url("https://raw.githubusercontent.com/octo/demo/main/README.md").as_deref(),
            Some("https://raw.githubusercontent.com/octo/demo/main/")
        );
        assert_eq!(
            parent_url("https://raw.githubusercontent.com/octo/demo/main/docs/README.md")
                .as_deref(),
            Some("https://raw.githubusercontent.com/octo/demo/main/docs/")
        );
        assert!(parent_url("not a url").is_none());
    }

    #[test]
    fn forbidden_maps_to_rate_limit_with_reset() {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from_static("1000060"));

        let err = status_error(StatusCode::FORBIDDEN, &headers, 1_000_000);
        assert_eq!(
            err,
            ProviderError::RateLimited {
                retry_after: Some(60)
            }
        );
    }

    #[test]
    fn retry_after_header_wins_over_reset() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from_static("1000060"));

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, &headers, 1_000_000);
        assert_eq!(
            err,
            ProviderError::RateLimited {
                retry_after: Some(5)
            }
        );
    }

    #[test]
    fn other_statuses_map_to_not_found_or_failed() {
        let headers = HeaderMap::new();
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, &headers, 0),
            ProviderError::NotFound
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, &headers, 0),
            ProviderError::Failed { status: 502 }
        );
        assert_eq!(
            status_error(StatusCode::FORBIDDEN, &headers, 0),
            ProviderError::RateLimited { retry_after: None }
        );
    }

    #[test]
    fn trending_query_uses_creation_date() {
        assert_eq!(
            trending_query(date!(2024 - 03 - 07)).expect("format"),
            "created:>2024-03-07"
        );
    }

    #[test]
    fn endpoint_encodes_query_pairs() {
        let settings = GithubSettings {
            api_base: Url::parse("https://api.github.com/").expect("url"),
            raw_base: Url::parse("https://raw.githubusercontent.com/").expect("url"),
            token: None,
            user_agent: "gitreader-test".to_string(),
            request_timeout: std::time::Duration::from_secs(1),
            per_page: std::num::NonZeroU32::new(10).expect("non-zero"),
        };
        let client = GitHubClient::new(&settings).expect("client");
        let url = client
            .endpoint("search/repositories", &[("q", "machine learning".to_string())])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/search/repositories?q=machine+learning"
        );

        let repository = RepositoryRef::new("octo", "demo").expect("repo");
        assert_eq!(
            client.fallback_base(&repository).as_deref(),
            Some("https://raw.githubusercontent.com/octo/demo/HEAD/")
        );
    }
}
