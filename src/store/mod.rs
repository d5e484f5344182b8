use std::path::PathBuf;

pub mod credential;
pub mod disk;
pub mod index;
pub mod secret;

pub use credential::CredentialRecord;
pub use index::CredentialStore;
pub use secret::{SECRET_LEN, Secret, SecretError};

use crate::serial::Serial;

/// File name of the store document inside the config directory.
pub const STORE_FILE: &str = "serials.toml";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable at {}: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("no credential for serial {0}")]
    UnknownSerial(Serial),
}

/// How an insert treats the default pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Leave the default pointer alone.
    Keep,
    /// Point the default at the inserted serial only if no default is set.
    IfUnset,
    /// Always point the default at the inserted serial.
    Always,
}
