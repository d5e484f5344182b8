use std::io::Write;

use crate::refresh::TokenSink;
use crate::token::{TOKEN_DIGITS, Token, TokenError};

/// ANSI "erase to end of line"; a short token must not leave part of a
/// longer error marker on screen.
const CLEAR_EOL: &str = "\x1b[K";

/// Rewrites a single terminal line with each new token.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = write!(self.out, "\r{line}{CLEAR_EOL}").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write token");
        }
    }
}

impl<W: Write> TokenSink for TerminalSink<W> {
    fn token(&mut self, token: &Token) {
        self.emit(&token.to_string());
    }

    fn error(&mut self, err: &TokenError) {
        let marker = "-".repeat(TOKEN_DIGITS as usize);
        self.emit(&format!("{marker} ({err})"));
    }
}
