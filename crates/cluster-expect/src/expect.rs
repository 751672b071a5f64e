//! Prompt patterns and expect-loop parameters.
//!
//! The expect primitive tests each freshly received chunk against a
//! [`Prompt`]. Matching is chunk-local: a prompt split across two reads
//! will not match, and that is the accepted tradeoff for a stream with no
//! message boundaries — login prompts are short and arrive whole in
//! practice. Partial (substring) matching is the default; exact matching
//! is rarely useful because shells decorate their prompts.

use std::time::Duration;

use regex::Regex;

use crate::config::DEFAULT_RECV_TIMEOUT;

/// A pattern tested against a single received chunk.
#[derive(Debug, Clone)]
pub enum Prompt {
    /// Match when the chunk contains the string (partial match).
    Contains(String),
    /// Match when the chunk equals the string exactly.
    Exact(String),
    /// Match when the regex finds a match in the chunk.
    Regex(Regex),
}

impl Prompt {
    /// Create a substring prompt (the usual choice).
    #[must_use]
    pub fn contains(s: impl Into<String>) -> Self {
        Self::Contains(s.into())
    }

    /// Create an exact-equality prompt.
    #[must_use]
    pub fn exact(s: impl Into<String>) -> Self {
        Self::Exact(s.into())
    }

    /// Create a regex prompt.
    pub fn regex(pattern: &str) -> crate::error::Result<Self> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    /// Test this prompt against one chunk.
    #[must_use]
    pub fn matches(&self, chunk: &str) -> bool {
        match self {
            Self::Contains(s) => chunk.contains(s),
            Self::Exact(s) => chunk == s,
            Self::Regex(re) => re.is_match(chunk),
        }
    }

    /// The pattern text, for logging.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Contains(s) | Self::Exact(s) => s,
            Self::Regex(re) => re.as_str(),
        }
    }
}

impl From<&str> for Prompt {
    fn from(s: &str) -> Self {
        Self::Contains(s.to_string())
    }
}

impl From<String> for Prompt {
    fn from(s: String) -> Self {
        Self::Contains(s)
    }
}

/// Tuning for one expect call.
#[derive(Debug, Clone)]
pub struct ExpectOptions {
    /// Timeout for each receive iteration.
    pub recv_timeout: Duration,
    /// Wall-clock budget for the whole call. Soft bound: a single slow
    /// receive can overshoot it by up to `recv_timeout`.
    pub total_timeout: Duration,
    /// Sleep between iterations; keeps the loop interruptible.
    pub poll_sleep: Duration,
    /// Strip ANSI escapes from the chunk before matching.
    pub strip_ansi: bool,
}

impl Default for ExpectOptions {
    fn default() -> Self {
        Self {
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            total_timeout: Duration::from_secs(60),
            poll_sleep: Duration::from_millis(50),
            strip_ansi: false,
        }
    }
}

impl ExpectOptions {
    /// Create options with a total timeout, other fields default.
    #[must_use]
    pub fn new(total_timeout: Duration) -> Self {
        Self {
            total_timeout,
            ..Default::default()
        }
    }

    /// Set the per-iteration receive timeout.
    #[must_use]
    pub const fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Set the total wall-clock budget.
    #[must_use]
    pub const fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    /// Set the sleep between iterations.
    #[must_use]
    pub const fn poll_sleep(mut self, sleep: Duration) -> Self {
        self.poll_sleep = sleep;
        self
    }

    /// Strip ANSI escapes before matching.
    #[must_use]
    pub const fn strip_ansi(mut self, strip: bool) -> Self {
        self.strip_ansi = strip;
        self
    }
}

/// Result of one expect call.
///
/// Failing to match within the budget is an ordinary outcome, not an
/// error — check `matched`.
#[derive(Debug, Clone)]
pub struct ExpectOutcome {
    /// The most recently received chunk (possibly empty if nothing ever
    /// arrived).
    pub last_chunk: String,
    /// Whether the prompt matched.
    pub matched: bool,
}

impl ExpectOutcome {
    /// Create an outcome.
    #[must_use]
    pub const fn new(last_chunk: String, matched: bool) -> Self {
        Self {
            last_chunk,
            matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_matches_inside_chunk() {
        let prompt = Prompt::contains("ready");
        assert!(prompt.matches("...system ready for login..."));
        assert!(!prompt.matches("read"));
    }

    #[test]
    fn exact_requires_whole_chunk() {
        let prompt = Prompt::exact("$ ");
        assert!(prompt.matches("$ "));
        assert!(!prompt.matches("[alice@login01 ~]$ "));
    }

    #[test]
    fn regex_prompt() {
        let prompt = Prompt::regex(r"\[\w+@\w+ .*\][$#] ").unwrap();
        assert!(prompt.matches("banner\n[alice@login01 ~]$ "));
        assert!(!prompt.matches("alice@login01"));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        assert!(Prompt::regex("[unclosed").is_err());
    }

    #[test]
    fn from_str_is_partial_match() {
        let prompt: Prompt = "Passcode or option".into();
        assert!(matches!(prompt, Prompt::Contains(_)));
    }

    #[test]
    fn options_builder() {
        let opts = ExpectOptions::new(Duration::from_secs(10))
            .recv_timeout(Duration::from_millis(300))
            .poll_sleep(Duration::from_millis(10));
        assert_eq!(opts.total_timeout, Duration::from_secs(10));
        assert_eq!(opts.recv_timeout, Duration::from_millis(300));
    }
}
