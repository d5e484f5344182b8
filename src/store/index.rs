use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::{
    DefaultPolicy, Secret, StoreError,
    credential::{CredentialRecord, SerialEntry, StoreDocument},
    disk,
};
use crate::serial::{self, Serial};

/// Parsed, validated view of the store document.
#[derive(Debug, Default, Clone)]
struct Snapshot {
    default: Option<Serial>,
    records: BTreeMap<Serial, CredentialRecord>,
}

impl Snapshot {
    fn from_document(path: &Path, doc: StoreDocument) -> Result<Self, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let mut records = BTreeMap::new();
        for (key, entry) in doc.serials {
            let serial = serial::normalize(&key)
                .map_err(|e| corrupt(format!("section {key:?}: {e}")))?;
            if serial.as_str() != key {
                return Err(corrupt(format!("section {key:?} is not a canonical serial")));
            }
            let secret = Secret::from_hex(&entry.secret)
                .map_err(|e| corrupt(format!("secret for {key}: {e}")))?;
            records.insert(
                serial.clone(),
                CredentialRecord {
                    serial,
                    secret,
                    region: entry.region,
                    created_at: entry.created_at,
                },
            );
        }

        let default = match doc.default {
            Some(raw) => match serial::normalize(&raw) {
                Ok(serial) if records.contains_key(&serial) => Some(serial),
                _ => {
                    tracing::warn!(path = %path.display(), default = %raw, "Ignoring default that names no stored serial");
                    None
                }
            },
            None => None,
        };

        Ok(Self { default, records })
    }

    fn to_document(&self) -> StoreDocument {
        StoreDocument {
            default: self.default.as_ref().map(|s| s.to_string()),
            serials: self
                .records
                .iter()
                .map(|(serial, record)| (serial.to_string(), SerialEntry::from(record)))
                .collect(),
        }
    }
}

/// File-backed credential store with a single default pointer.
///
/// Reads are served from an in-memory snapshot. Every mutation holds the
/// snapshot write guard and an exclusive lock on `serials.toml.lock`, re-reads
/// the document so changes made by other processes are kept, and atomically
/// replaces the file before the snapshot is updated.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    state: RwLock<Snapshot>,
}

impl CredentialStore {
    /// Load the store at `path`. A missing file yields an empty store; nothing
    /// is created until the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = Snapshot::from_document(&path, disk::read_document(&path)?)?;
        tracing::debug!(path = %path.display(), count = snapshot.records.len(), "Credential store loaded");
        Ok(Self {
            path,
            state: RwLock::new(snapshot),
        })
    }

    /// Exact lookup by canonical serial. The store does not normalize.
    pub fn get(&self, serial: &Serial) -> Option<Secret> {
        self.read().records.get(serial).map(|r| r.secret.clone())
    }

    pub fn record(&self, serial: &Serial) -> Option<CredentialRecord> {
        self.read().records.get(serial).cloned()
    }

    /// All stored serials in canonical order.
    pub fn serials(&self) -> Vec<Serial> {
        self.read().records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn default_serial(&self) -> Option<Serial> {
        self.read().default.clone()
    }

    /// Insert or overwrite the secret for `serial`. Metadata of an existing
    /// record is kept.
    pub fn put(&self, serial: &Serial, secret: Secret) -> Result<(), StoreError> {
        self.mutate(|snap| {
            match snap.records.get_mut(serial) {
                Some(existing) if existing.secret == secret => return Ok(false),
                Some(existing) => existing.secret = secret.clone(),
                None => {
                    snap.records.insert(
                        serial.clone(),
                        CredentialRecord::new(serial.clone(), secret.clone()),
                    );
                }
            }
            Ok(true)
        })?;
        tracing::info!(serial = %serial, "Stored credential");
        Ok(())
    }

    /// Insert `record` and update the default pointer in the same write.
    /// Returns whether the record is now the default.
    pub fn insert(&self, record: CredentialRecord, policy: DefaultPolicy) -> Result<bool, StoreError> {
        let serial = record.serial.clone();
        let mut is_default = false;
        self.mutate(|snap| {
            snap.records.insert(serial.clone(), record.clone());
            let make_default = match policy {
                DefaultPolicy::Keep => false,
                DefaultPolicy::IfUnset => snap.default.is_none(),
                DefaultPolicy::Always => true,
            };
            if make_default {
                snap.default = Some(serial.clone());
            }
            is_default = snap.default.as_ref() == Some(&serial);
            Ok(true)
        })?;
        tracing::info!(serial = %serial, default = is_default, "Stored credential");
        Ok(is_default)
    }

    /// Point the default at `serial`. Fails if no record exists for it.
    pub fn set_default(&self, serial: &Serial) -> Result<(), StoreError> {
        self.mutate(|snap| {
            if !snap.records.contains_key(serial) {
                return Err(StoreError::UnknownSerial(serial.clone()));
            }
            if snap.default.as_ref() == Some(serial) {
                return Ok(false);
            }
            snap.default = Some(serial.clone());
            Ok(true)
        })?;
        tracing::info!(serial = %serial, "Default serial set");
        Ok(())
    }

    pub fn clear_default(&self) -> Result<(), StoreError> {
        self.mutate(|snap| Ok(snap.default.take().is_some()))?;
        tracing::info!("Default serial cleared");
        Ok(())
    }

    /// Remove the record for `serial`. A default pointing at it is cleared in
    /// the same write. Returns false if there was nothing to remove.
    pub fn remove(&self, serial: &Serial) -> Result<bool, StoreError> {
        let removed = self.mutate(|snap| {
            if snap.records.remove(serial).is_none() {
                return Ok(false);
            }
            if snap.default.as_ref() == Some(serial) {
                snap.default = None;
            }
            Ok(true)
        })?;
        if removed {
            tracing::info!(serial = %serial, "Removed credential");
        }
        Ok(removed)
    }

    /// Run `f` against a fresh copy of the persisted state under both locks.
    /// `f` returns whether it changed anything; unchanged state is not written.
    ///
    /// `f` is first tried on a lock-free read. If it rejects the change or has
    /// nothing to do, that result stands and neither the directory nor the lock
    /// file is created.
    fn mutate<F>(&self, mut f: F) -> Result<bool, StoreError>
    where
        F: FnMut(&mut Snapshot) -> Result<bool, StoreError>,
    {
        // The snapshot is only ever replaced wholesale, so a poisoned guard
        // still holds a consistent value.
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let mut preview = Snapshot::from_document(&self.path, disk::read_document(&self.path)?)?;
        if !f(&mut preview)? {
            *state = preview;
            return Ok(false);
        }

        let mut lock = fd_lock::RwLock::new(disk::open_lock_file(&self.path)?);
        let _guard = lock.write().map_err(|source| StoreError::Unavailable {
            path: disk::lock_path(&self.path),
            source,
        })?;

        let mut fresh = Snapshot::from_document(&self.path, disk::read_document(&self.path)?)?;
        let changed = f(&mut fresh)?;
        if changed {
            disk::write_document(&self.path, &fresh.to_document())?;
        }
        *state = fresh;
        Ok(changed)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
