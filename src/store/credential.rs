use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Secret;
use crate::serial::Serial;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub serial: Serial,
    pub secret: Secret,
    pub region: Option<String>,
    pub created_at: u64, // Unix timestamp
}

impl CredentialRecord {
    pub fn new(serial: Serial, secret: Secret) -> Self {
        Self {
            serial,
            secret,
            region: None,
            created_at: unix_now(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// On-disk layout of `serials.toml`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct StoreDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub serials: BTreeMap<String, SerialEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SerialEntry {
    pub secret: String, // lower-case hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub created_at: u64,
}

impl From<&CredentialRecord> for SerialEntry {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            secret: record.secret.to_hex(),
            region: record.region.clone(),
            created_at: record.created_at,
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
