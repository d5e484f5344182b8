use std::fmt;
use std::time::Duration;

use crate::store::Secret;

pub mod totp;

pub use totp::HmacTokenSource;

/// Number of digits a token is rendered with.
pub const TOKEN_DIGITS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("secret rejected by token source: {0}")]
    InvalidSecret(String),
    #[error("system clock is before the Unix epoch")]
    Clock,
    #[error("token source unavailable: {0}")]
    Unavailable(String),
}

impl TokenError {
    /// Whether a later query may succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TokenError::InvalidSecret(_))
    }
}

/// A one-time code and the time left before it rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub code: u32,
    pub remaining: Duration,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.code, width = TOKEN_DIGITS as usize)
    }
}

/// Derives the currently valid token for a secret.
///
/// Callers query again on every refresh instead of extrapolating from
/// `Token::remaining`.
pub trait TokenSource: Send + Sync {
    fn current_token(&self, secret: &Secret) -> Result<Token, TokenError>;
}

impl<T: TokenSource + ?Sized> TokenSource for &T {
    fn current_token(&self, secret: &Secret) -> Result<Token, TokenError> {
        (**self).current_token(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display_is_zero_padded() {
        let token = Token {
            code: 7_081_804,
            remaining: Duration::from_secs(1),
        };
        assert_eq!(token.to_string(), "07081804");
    }

    #[test]
    fn test_only_invalid_secret_is_fatal() {
        assert!(!TokenError::InvalidSecret("bad".into()).is_transient());
        assert!(TokenError::Clock.is_transient());
        assert!(TokenError::Unavailable("busy".into()).is_transient());
    }
}
