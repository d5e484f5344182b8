use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::Secret;
use crate::token::{Token, TokenError, TokenSource};

/// Period between token queries in live mode.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Why a loop reached [`LoopState::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh loop already stopped")]
    AlreadyStopped,
    #[error("token source failed: {0}")]
    Token(#[from] TokenError),
}

/// Receives every token (or per-tick failure) produced by a [`RefreshLoop`].
pub trait TokenSink {
    fn token(&mut self, token: &Token);
    fn error(&mut self, err: &TokenError);
}

/// Queries a [`TokenSource`] once per period and feeds a [`TokenSink`] until
/// cancelled. A stopped loop cannot be restarted; build a new one.
pub struct RefreshLoop<T> {
    source: T,
    period: Duration,
    state: LoopState,
}

impl<T: TokenSource> RefreshLoop<T> {
    pub fn new(source: T) -> Self {
        Self::with_period(source, DEFAULT_PERIOD)
    }

    pub fn with_period(source: T, period: Duration) -> Self {
        Self {
            source,
            period,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Drive the loop. Queries immediately, then once per period. `cancel` is
    /// honoured mid-sleep and before every query. Transient source failures
    /// go to `sink.error` and the loop continues; a fatal one stops it.
    pub async fn run<S: TokenSink>(
        &mut self,
        secret: &Secret,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<StopReason, RefreshError> {
        if self.state == LoopState::Stopped {
            return Err(RefreshError::AlreadyStopped);
        }
        self.state = LoopState::Running;
        tracing::debug!(period_ms = self.period.as_millis() as u64, "Refresh loop running");

        let result = self.drive(secret, sink, cancel).await;
        self.state = LoopState::Stopped;
        match &result {
            Ok(reason) => tracing::debug!(?reason, "Refresh loop stopped"),
            Err(e) => tracing::warn!(error = %e, "Refresh loop stopped"),
        }
        result
    }

    async fn drive<S: TokenSink>(
        &self,
        secret: &Secret,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<StopReason, RefreshError> {
        let mut ticks = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }

            match self.source.current_token(secret) {
                Ok(token) => sink.token(&token),
                Err(e) if e.is_transient() => {
                    tracing::warn!(tick = ticks, error = %e, "Token query failed");
                    sink.error(&e);
                }
                Err(e) => {
                    sink.error(&e);
                    return Err(e.into());
                }
            }
            ticks += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StopReason::Cancelled),
                _ = tokio::time::sleep(self.period) => {}
            }
        }
    }
}
