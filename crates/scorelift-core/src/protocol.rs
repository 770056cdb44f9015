//! Line-oriented status protocol written to stdout.
//!
//! A parent process runs `scorelift` and scrapes its stdout. Ordinary lines
//! are informational; four prefixes carry machine-readable results:
//!
//! - `SUCCESS:<path>` the score was written and verified
//! - `ERROR:<message>` a failure message
//! - `TRACEBACK:<text>` the cause chain for the preceding error
//! - `COMPLETED:<path>` the run finished with a score at `<path>`

use std::error::Error as StdError;
use std::fmt;

/// A machine-readable line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    Success,
    Error,
    Traceback,
    Completed,
}

impl Sentinel {
    /// The literal prefix, colon included.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS:",
            Self::Error => "ERROR:",
            Self::Traceback => "TRACEBACK:",
            Self::Completed => "COMPLETED:",
        }
    }

    /// Format a protocol line for this sentinel.
    pub fn line(self, payload: impl fmt::Display) -> String {
        format!("{}{}", self.prefix(), payload)
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches(':'))
    }
}

/// Render an error and every `source()` beneath it, one per line, outermost
/// first.
pub fn traceback(err: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        lines.push(format!("caused by: {cause}"));
        current = cause.source();
    }
    lines.join("\n")
}
