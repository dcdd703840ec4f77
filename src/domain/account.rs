//! Email and password credentials accepted by the sign-up and sign-in flows.

use super::error::DomainError;

/// Shortest password the identity provider accepts.
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Trims the email and checks both fields. The password is kept verbatim.
    pub fn new(email: &str, password: &str) -> Result<Self, DomainError> {
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(DomainError::InvalidEmail {
                value: email.to_string(),
            });
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(DomainError::PasswordTooShort {
                min: MIN_PASSWORD_CHARS,
            });
        }
        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// Passwords never reach logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
