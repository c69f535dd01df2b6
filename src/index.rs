//! Folding of physical index names into a canonical series name.
//!
//! Rollover and time-based indices (`logs-000042`, `logs-2023.01.02`) and
//! wildcard patterns (`logs-*`) all report under `logs` once folded.

use crate::error::ConfigError;
use regex::Regex;

/// Rules applied when aggregation is switched on without explicit patterns:
/// wildcard suffix, rollover suffix, then date suffix.
pub const DEFAULT_CLEAN_SUFFIX: &[&str] = &[r"-?\*$", r"-\d{6}$", r"-\d{4}[.\-]\d{2}[.\-]\d{2}$"];

/// Ordered list of suffix-stripping rules.
///
/// Each rule removes its first match; the output of one rule is the input of
/// the next. An aggregator with no rules leaves names untouched.
#[derive(Debug, Clone, Default)]
pub struct IndexAggregator {
    rules: Vec<Regex>,
}

impl IndexAggregator {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Compiles `patterns` in order. Patterns may be written bare (`-\d+$`)
    /// or slash-delimited (`/-\d+$/`).
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let rules = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref().trim();
                Regex::new(strip_delimiters(pattern)).map_err(|source| {
                    ConfigError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn with_default_rules() -> Result<Self, ConfigError> {
        Self::new(DEFAULT_CLEAN_SUFFIX)
    }

    pub fn is_enabled(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn aggregate(&self, index: &str) -> String {
        self.rules.iter().fold(index.to_string(), |name, rule| {
            rule.replace(&name, "").into_owned()
        })
    }

    /// Same as [`aggregate`](Self::aggregate), passing absent names through.
    pub fn aggregate_opt(&self, index: Option<&str>) -> Option<String> {
        index.map(|name| self.aggregate(name))
    }
}

fn strip_delimiters(pattern: &str) -> &str {
    pattern
        .strip_prefix('/')
        .and_then(|inner| inner.strip_suffix('/'))
        .filter(|inner| !inner.is_empty())
        .unwrap_or(pattern)
}
