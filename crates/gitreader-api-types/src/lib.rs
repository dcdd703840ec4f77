//! Wire types shared by the gitreader HTTP API and its clients.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Colour scheme requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown theme `{}`, expected `light` or `dark`", self.0)
    }
}

impl std::error::Error for UnknownTheme {}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    pub avatar_url: String,
}

/// One repository as returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub language: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub owner: RepositoryOwner,
}

/// Entry in the pagination window. Gaps are rendered as an ellipsis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageLink {
    Page { number: u32, current: bool },
    Gap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationView {
    pub current_page: u32,
    pub total_pages: u32,
    pub per_page: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub window: Vec<PageLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_count: u64,
    pub incomplete_results: bool,
    /// True when the provider holds more results than it will ever page through.
    pub truncated: bool,
    pub items: Vec<RepositorySummary>,
    pub pagination: PaginationView,
    /// Set when a newer search was issued for the same session; items are empty.
    #[serde(default)]
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Trending,
    Popular,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub query: String,
    pub kind: SuggestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSourceView {
    Declared,
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeBadgeView {
    AutoDetected,
    NoLanguage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFenceView {
    pub language: String,
    pub source: LanguageSourceView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<CodeBadgeView>,
    pub line_count: usize,
    pub line_numbers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedBlockView {
    pub kind: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<CodeFenceView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub theme: Theme,
    pub html: String,
    pub degraded: bool,
    pub blocks: Vec<RenderedBlockView>,
    pub stylesheet_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequestBody {
    pub markdown: String,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    #[default]
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: String,
    pub price_id: String,
    pub name: String,
    pub description: String,
    pub mode: CheckoutMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequestBody {
    pub price_id: String,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponseBody {
    pub session_id: String,
    pub url: String,
}

/// Email and password posted to the sign-up and sign-in endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUserView {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSessionView {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub user: AuthUserView,
}

/// Sign-up result. `session` is absent while the address awaits confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub user: AuthUserView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<AuthSessionView>,
    pub confirmation_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(" light ".parse::<Theme>(), Ok(Theme::Light));
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn page_link_serializes_with_kind_tag() {
        let json = serde_json::to_value(PageLink::Page {
            number: 3,
            current: true,
        })
        .expect("serialize");
        assert_eq!(json["kind"], "page");
        assert_eq!(json["number"], 3);

        let gap = serde_json::to_value(PageLink::Gap).expect("serialize");
        assert_eq!(gap["kind"], "gap");
    }

    #[test]
    fn repository_summary_reads_github_timestamps() {
        let raw = r#"{
            "id": 1,
            "name": "demo",
            "full_name": "octo/demo",
            "description": null,
            "html_url": "https://github.com/octo/demo",
            "stargazers_count": 10,
            "forks_count": 2,
            "language": "Rust",
            "updated_at": "2024-05-01T12:00:00Z",
            "owner": { "login": "octo", "avatar_url": "https://example.com/a.png" }
        }"#;
        let summary: RepositorySummary = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(summary.updated_at.year(), 2024);
        assert!(summary.description.is_none());
    }
}
