use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::refresh::{DEFAULT_PERIOD, RefreshLoop, StopReason, TokenSink};
use crate::registration::RegistrationService;
use crate::serial::{self, Serial};
use crate::store::{CredentialRecord, CredentialStore, DefaultPolicy, Secret};
use crate::token::{Token, TokenSource};

/// One row of [`Orchestrator::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedSerial {
    pub serial: Serial,
    /// Display form, or the canonical form if the serial is not well-formed.
    pub pretty: String,
    pub is_default: bool,
}

/// User-facing operations over an injected store and token source.
pub struct Orchestrator<T> {
    store: Arc<CredentialStore>,
    tokens: T,
    period: Duration,
}

impl<T: TokenSource> Orchestrator<T> {
    pub fn new(store: Arc<CredentialStore>, tokens: T) -> Self {
        Self {
            store,
            tokens,
            period: DEFAULT_PERIOD,
        }
    }

    /// Override the live refresh period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Request a new authenticator and store it. It becomes the default when
    /// `set_default` is given or no default exists yet. Returns the display
    /// serial.
    pub async fn register<R>(&self, service: &R, region: &str, set_default: bool) -> Result<String>
    where
        R: RegistrationService + ?Sized,
    {
        let issued = service.request_new_credential(region).await?;
        tracing::debug!(region, serial = %issued.serial, "Authenticator issued");
        let record = CredentialRecord::new(serial::normalize(&issued.serial)?, issued.secret)
            .with_region(region);
        self.store_record(record, set_default)
    }

    /// Store an authenticator whose serial and hex secret are already known.
    pub fn import(
        &self,
        serial: &str,
        secret_hex: &str,
        region: Option<&str>,
        set_default: bool,
    ) -> Result<String> {
        let serial = serial::normalize(serial)?;
        let secret = Secret::from_hex(secret_hex)?;
        let mut record = CredentialRecord::new(serial, secret);
        if let Some(region) = region {
            record = record.with_region(region);
        }
        self.store_record(record, set_default)
    }

    fn store_record(&self, record: CredentialRecord, set_default: bool) -> Result<String> {
        // Reject malformed serials before touching the disk.
        let pretty = record.serial.pretty()?;
        let policy = if set_default {
            DefaultPolicy::Always
        } else {
            DefaultPolicy::IfUnset
        };
        self.store.insert(record, policy)?;
        Ok(pretty)
    }

    /// The explicit serial if given, else the stored default.
    pub fn resolve_serial(&self, explicit: Option<&str>) -> Result<Serial> {
        match explicit {
            Some(input) => Ok(serial::normalize(input)?),
            None => self.store.default_serial().ok_or(Error::NoSerialAvailable),
        }
    }

    pub fn set_default(&self, serial: &str) -> Result<()> {
        let serial = serial::normalize(serial)?;
        self.store.set_default(&serial)?;
        Ok(())
    }

    pub fn show_once(&self, serial: &str) -> Result<Token> {
        let secret = self.lookup(serial)?;
        Ok(self.tokens.current_token(&secret)?)
    }

    /// Look up `serial` and feed `sink` a fresh token every period until
    /// `cancel` fires.
    pub async fn show_live<S: TokenSink>(
        &self,
        serial: &str,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<StopReason> {
        let secret = self.lookup(serial)?;
        let mut refresh = RefreshLoop::with_period(&self.tokens, self.period);
        Ok(refresh.run(&secret, sink, cancel).await?)
    }

    pub fn list(&self) -> Vec<ListedSerial> {
        let default = self.store.default_serial();
        self.store
            .serials()
            .into_iter()
            .map(|serial| ListedSerial {
                pretty: serial.pretty().unwrap_or_else(|_| serial.to_string()),
                is_default: default.as_ref() == Some(&serial),
                serial,
            })
            .collect()
    }

    /// Remove a stored authenticator; clears the default if it pointed there.
    pub fn remove(&self, serial: &str) -> Result<bool> {
        let serial = serial::normalize(serial)?;
        Ok(self.store.remove(&serial)?)
    }

    fn lookup(&self, serial: &str) -> Result<Secret> {
        let serial = serial::normalize(serial)?;
        self.store.get(&serial).ok_or(Error::UnknownSerial(serial))
    }
}
