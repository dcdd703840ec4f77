use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("search query must not be empty")]
    EmptyQuery,
    #[error("search query exceeds {max} characters")]
    QueryTooLong { max: usize },
    #[error("invalid repository {part} `{value}`")]
    InvalidRepository { part: &'static str, value: String },
    #[error("page {page} is out of range")]
    PageOutOfRange { page: u32 },
    #[error("unknown product price `{price_id}`")]
    UnknownProduct { price_id: String },
    #[error("`{value}` is not a valid email address")]
    InvalidEmail { value: String },
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("return URL `{url}` is not on an allowed origin")]
    ForeignReturnUrl { url: String },
}

impl DomainError {
    pub fn invalid_repository(part: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidRepository {
            part,
            value: value.into(),
        }
    }
}
