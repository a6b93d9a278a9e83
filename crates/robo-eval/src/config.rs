//! Interpreter configuration.

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Spaces per nesting level in the instruction log.
pub const DEFAULT_INDENT_WIDTH: usize = 2;

/// Settings for one interpreter run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where to write the call trace. No trace is written when unset.
    pub trace: Option<PathBuf>,
    /// Spaces per nesting level in emitted instructions.
    pub indent_width: usize,
    /// Default number of frames shown by `stack_trace`.
    pub backtrace_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trace: None,
            indent_width: DEFAULT_INDENT_WIDTH,
            backtrace_limit: None,
        }
    }
}

impl Config {
    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json(json: &str) -> EvalResult<Self> {
        serde_json::from_str(json).map_err(|e| EvalError::Config(e.to_string()))
    }

    pub fn with_trace(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace = Some(path.into());
        self
    }

    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn with_backtrace_limit(mut self, limit: usize) -> Self {
        self.backtrace_limit = Some(limit);
        self
    }
}
