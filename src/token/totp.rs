use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::{TOKEN_DIGITS, Token, TokenError, TokenSource};
use crate::store::Secret;

type HmacSha1 = Hmac<Sha1>;

/// Seconds each token stays valid.
pub const PERIOD_SECS: u64 = 30;

/// Time-stepped HMAC-SHA1 token source (RFC 6238 with 8 digits), as used by
/// Battle.net style authenticators.
#[derive(Debug, Clone, Copy)]
pub struct HmacTokenSource {
    period: u64,
}

impl HmacTokenSource {
    pub fn new() -> Self {
        Self { period: PERIOD_SECS }
    }

    /// Token valid at `unix_secs`.
    pub fn at(&self, secret: &Secret, unix_secs: u64) -> Result<Token, TokenError> {
        let step = unix_secs / self.period;
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
            .map_err(|e| TokenError::InvalidSecret(e.to_string()))?;
        mac.update(&step.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // Dynamic truncation: low nibble of the last byte picks a 4-byte window.
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let window = u32::from_be_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);
        let code = (window & 0x7fff_ffff) % 10u32.pow(TOKEN_DIGITS);

        Ok(Token {
            code,
            remaining: Duration::from_secs(self.period - unix_secs % self.period),
        })
    }
}

impl Default for HmacTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for HmacTokenSource {
    fn current_token(&self, secret: &Secret) -> Result<Token, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::Clock)?;
        self.at(secret, now.as_secs())
    }
}
