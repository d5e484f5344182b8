use std::fmt;

/// Length in bytes of an authenticator secret.
pub const SECRET_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SecretError {
    #[error("secret is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("secret must be 20 bytes, got {0}")]
    Length(usize),
}

/// Authenticator key material. Stored at rest as lower-case hex.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; SECRET_LEN]);

impl Secret {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SecretError> {
        let raw: [u8; SECRET_LEN] = bytes
            .try_into()
            .map_err(|_| SecretError::Length(bytes.len()))?;
        Ok(Self(raw))
    }

    pub fn from_hex(encoded: &str) -> Result<Self, SecretError> {
        let bytes = hex::decode(encoded.trim())?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SECRET_LEN]> for Secret {
    fn from(raw: [u8; SECRET_LEN]) -> Self {
        Self(raw)
    }
}

// Never print key material, not even at trace level.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_lower_case() {
        let secret = Secret::from([0xAB; SECRET_LEN]);
        assert_eq!(secret.to_hex(), "ab".repeat(SECRET_LEN));
    }

    #[test]
    fn test_from_hex_accepts_upper_case_input() {
        let secret = Secret::from_hex(&"CD".repeat(SECRET_LEN)).unwrap();
        assert_eq!(secret.as_bytes(), &[0xCD; SECRET_LEN]);
    }

    #[test]
    fn test_from_hex_rejects_odd_length() {
        assert!(matches!(
            Secret::from_hex("abc"),
            Err(SecretError::Hex(hex::FromHexError::OddLength))
        ));
    }

    #[test]
    fn test_from_hex_rejects_non_hex() {
        let bad = format!("zz{}", "00".repeat(SECRET_LEN - 1));
        assert!(matches!(Secret::from_hex(&bad), Err(SecretError::Hex(_))));
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert_eq!(Secret::from_hex("0011"), Err(SecretError::Length(2)));
    }

    #[test]
    fn test_debug_redacts() {
        let secret = Secret::from([0x42; SECRET_LEN]);
        assert_eq!(format!("{secret:?}"), "Secret(..)");
    }
}
