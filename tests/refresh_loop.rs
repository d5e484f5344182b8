use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bnauth::refresh::{LoopState, RefreshError, RefreshLoop, StopReason, TokenSink};
use bnauth::store::{SECRET_LEN, Secret};
use bnauth::token::{Token, TokenError, TokenSource};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Token source driven by a closure over the 0-based call number.
struct Scripted<F> {
    calls: Arc<AtomicUsize>,
    script: F,
}

impl<F> Scripted<F>
where
    F: Fn(usize) -> Result<Token, TokenError> + Send + Sync,
{
    fn new(script: F) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                script,
            },
            calls,
        )
    }
}

impl<F> TokenSource for Scripted<F>
where
    F: Fn(usize) -> Result<Token, TokenError> + Send + Sync,
{
    fn current_token(&self, _secret: &Secret) -> Result<Token, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(n)
    }
}

fn token(code: usize) -> Result<Token, TokenError> {
    Ok(Token {
        code: code as u32,
        remaining: Duration::from_secs(30),
    })
}

#[derive(Debug, PartialEq)]
enum Event {
    Token(u32),
    Error(TokenError),
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl TokenSink for Recorder {
    fn token(&mut self, token: &Token) {
        self.events.push(Event::Token(token.code));
    }
    fn error(&mut self, err: &TokenError) {
        self.events.push(Event::Error(err.clone()));
    }
}

fn secret() -> Secret {
    Secret::from([0x5a; SECRET_LEN])
}

fn cancel_after(cancel: &CancellationToken, after: Duration) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        cancel.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn test_queries_once_per_period() {
    let (source, calls) = Scripted::new(token);
    let mut refresh = RefreshLoop::with_period(source, Duration::from_secs(1));
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(3500));

    let start = Instant::now();
    let mut sink = Recorder::default();
    let reason = refresh.run(&secret(), &mut sink, &cancel).await.unwrap();

    assert_eq!(reason, StopReason::Cancelled);
    assert_eq!(refresh.state(), LoopState::Stopped);
    // Queries at t = 0, 1, 2, 3.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(
        sink.events,
        vec![Event::Token(0), Event::Token(1), Event::Token(2), Event::Token(3)]
    );
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(3500) && elapsed < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_sleep_stops_before_next_query() {
    let (source, calls) = Scripted::new(token);
    let period = Duration::from_secs(10);
    let mut refresh = RefreshLoop::with_period(source, period);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(2));

    let start = Instant::now();
    let mut sink = Recorder::default();
    refresh.run(&secret(), &mut sink, &cancel).await.unwrap();

    assert!(start.elapsed() < period, "must not wait out the sleep");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.events, vec![Event::Token(0)]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_reported_and_loop_continues() {
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let (source, _calls) = Scripted::new(move |n: usize| match n {
        1 => Err(TokenError::Unavailable("busy".into())),
        2 => {
            stop.cancel();
            token(n)
        }
        _ => token(n),
    });
    let mut refresh = RefreshLoop::with_period(source, Duration::from_secs(1));

    let mut sink = Recorder::default();
    refresh.run(&secret(), &mut sink, &cancel).await.unwrap();

    // The failed tick shows an error marker, never the previous token again.
    assert_eq!(
        sink.events,
        vec![
            Event::Token(0),
            Event::Error(TokenError::Unavailable("busy".into())),
            Event::Token(2),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_fatal_failure_stops_loop() {
    let (source, calls) = Scripted::new(|n: usize| match n {
        0 => token(0),
        _ => Err(TokenError::InvalidSecret("rejected".into())),
    });
    let mut refresh = RefreshLoop::with_period(source, Duration::from_secs(1));

    let mut sink = Recorder::default();
    let err = refresh
        .run(&secret(), &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::Token(TokenError::InvalidSecret(_))));
    assert_eq!(refresh.state(), LoopState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(sink.events.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_loop_cannot_restart() {
    let (source, calls) = Scripted::new(token);
    let mut refresh = RefreshLoop::new(source);
    assert_eq!(refresh.state(), LoopState::Idle);

    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(500));
    let mut sink = Recorder::default();
    refresh.run(&secret(), &mut sink, &cancel).await.unwrap();

    let again = refresh
        .run(&secret(), &mut sink, &CancellationToken::new())
        .await;
    assert!(matches!(again, Err(RefreshError::AlreadyStopped)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A fresh loop instance runs normally.
    let (source, calls) = Scripted::new(token);
    let mut fresh = RefreshLoop::new(source);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(1500));
    fresh.run(&secret(), &mut sink, &cancel).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
