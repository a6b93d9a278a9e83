//! Whitespace-delimited token input for `read`.

use crate::error::{EvalError, EvalResult};
use std::collections::VecDeque;
use std::io::{self, BufRead, Cursor};

/// Pulls tokens from a line-oriented reader, one line at a time.
pub struct InputTokens {
    reader: Box<dyn BufRead>,
    pending: VecDeque<String>,
}

impl InputTokens {
    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            pending: VecDeque::new(),
        }
    }

    pub fn stdin() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    /// Tokens taken from a fixed string.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_reader(Cursor::new(text.into()))
    }

    /// The next token, or `None` once the reader is exhausted.
    pub fn next_token(&mut self) -> EvalResult<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    /// The next token parsed as an integer.
    pub fn next_integer(&mut self) -> EvalResult<i64> {
        let token = self
            .next_token()?
            .ok_or_else(|| EvalError::FormatError("end of input".to_string()))?;
        token.parse().map_err(|_| EvalError::FormatError(token))
    }
}

impl std::fmt::Debug for InputTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputTokens")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
