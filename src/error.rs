use std::path::PathBuf;

use crate::refresh::RefreshError;
use crate::registration::RegistrationError;
use crate::serial::{Serial, SerialError};
use crate::store::{SecretError, StoreError};
use crate::token::TokenError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid serial: {0}")]
    InvalidSerial(#[from] SerialError),
    #[error("invalid secret: {0}")]
    InvalidSecret(#[from] SecretError),
    #[error("{0}: no such serial")]
    UnknownSerial(Serial),
    #[error("no serial given and no default serial set")]
    NoSerialAvailable,
    #[error("storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store {}: {reason} (the file was left untouched)", .path.display())]
    CorruptStore { path: PathBuf, reason: String },
    #[error("registration request failed: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),
    #[error("token: {0}")]
    Token(#[from] TokenError),
    #[error("refresh: {0}")]
    Refresh(#[from] RefreshError),
}

impl Error {
    /// Network faults and transient token failures may succeed on retry;
    /// everything else needs the input or the local data fixed first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Token(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable { path, source } => Error::StorageUnavailable { path, source },
            StoreError::Corrupt { path, reason } => Error::CorruptStore { path, reason },
            StoreError::UnknownSerial(serial) => Error::UnknownSerial(serial),
        }
    }
}

impl From<RegistrationError> for Error {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Network(source) => Error::Network(source),
            RegistrationError::Rejected(reason) => Error::RegistrationRejected(reason),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
