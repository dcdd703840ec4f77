//! Repository identity and search inputs.

use std::fmt;

use gitreader_api_types::RepositorySummary;

use super::error::DomainError;

/// GitHub rejects longer search queries.
pub const MAX_QUERY_CHARS: usize = 256;
const MAX_OWNER_CHARS: usize = 39;
const MAX_NAME_CHARS: usize = 100;

/// `owner/name` pair identifying one repository card.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    pub fn new(owner: &str, name: &str) -> Result<Self, DomainError> {
        let owner = owner.trim();
        let name = name.trim();

        let owner_ok = !owner.is_empty()
            && owner.chars().count() <= MAX_OWNER_CHARS
            && !owner.starts_with('-')
            && owner.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !owner_ok {
            return Err(DomainError::invalid_repository("owner", owner));
        }

        let name_ok = !name.is_empty()
            && name != "."
            && name != ".."
            && name.chars().count() <= MAX_NAME_CHARS
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !name_ok {
            return Err(DomainError::invalid_repository("name", name));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A validated, trimmed search query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyQuery);
        }
        if trimmed.chars().count() > MAX_QUERY_CHARS {
            return Err(DomainError::QueryTooLong {
                max: MAX_QUERY_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of search results as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    pub items: Vec<RepositorySummary>,
    pub total_count: u64,
    pub incomplete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_ref_accepts_github_names() {
        let repo = RepositoryRef::new("rust-lang", "rust.vim").expect("valid");
        assert_eq!(repo.to_string(), "rust-lang/rust.vim");
    }

    #[test]
    fn repository_ref_rejects_path_tricks() {
        assert!(RepositoryRef::new("octo", "..").is_err());
        assert!(RepositoryRef::new("octo/evil", "repo").is_err());
        assert!(RepositoryRef::new("-octo", "repo").is_err());
        assert!(RepositoryRef::new("octo", "re po").is_err());
    }

    #[test]
    fn search_query_is_trimmed_and_bounded() {
        assert_eq!(SearchQuery::parse("  react ").unwrap().as_str(), "react");
        assert_eq!(SearchQuery::parse("   "), Err(DomainError::EmptyQuery));
        let long = "x".repeat(MAX_QUERY_CHARS + 1);
        assert!(matches!(
            SearchQuery::parse(&long),
            Err(DomainError::QueryTooLong { .. })
        ));
    }
}
