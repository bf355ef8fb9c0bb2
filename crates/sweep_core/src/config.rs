//! Sweep configuration: the value axis, the config-file patch target, and the
//! failure policy.
//!
//! A `SweepConfig` is plain data so it can be described in JSON and loaded
//! from disk; the line-matching pattern is compiled lazily when the sweep
//! starts.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// What the runner does when a patch or step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole sweep on the first failure (default).
    #[default]
    FailFast,
    /// Record the failure, skip the rest of that value's steps, and move on
    /// to the next value.
    ContinueOnError,
}

/// A single sweep: ordered parameter values plus the file-patch target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Ordered sweep values; each is applied exactly once, in list order.
    pub values: Vec<u64>,
    /// File rewritten in place before each iteration's steps run.
    pub config_file: PathBuf,
    /// Regular expression identifying the one line to rewrite.
    pub pattern: String,
    /// Replacement line; `{v}` is substituted with the current value.
    pub template: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl SweepConfig {
    /// Create a sweep over `values` that rewrites the line of `config_file`
    /// matching `pattern` with `template` (fail-fast by default).
    pub fn new(
        values: Vec<u64>,
        config_file: impl Into<PathBuf>,
        pattern: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            values,
            config_file: config_file.into(),
            pattern: pattern.into(),
            template: template.into(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Set the failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Load a sweep description from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, SweepError> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|err| SweepError::InvalidValues(format!("{}: {err}", path.display())))
    }

    /// Compile the line pattern, validating the sweep is runnable.
    pub fn compiled_pattern(&self) -> Result<Regex, SweepError> {
        if self.values.is_empty() {
            return Err(SweepError::InvalidValues(
                "sweep value list is empty".to_string(),
            ));
        }
        Regex::new(&self.pattern)
            .map_err(|err| SweepError::InvalidValues(format!("bad pattern `{}`: {err}", self.pattern)))
    }
}

/// Parse a comma-separated value list such as `2,4,8`.
pub fn parse_values(raw: &str) -> Result<Vec<u64>, SweepError> {
    let values = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u64>()
                .map_err(|_| SweepError::InvalidValues(format!("`{part}` is not an integer")))
        })
        .collect::<Result<Vec<u64>, SweepError>>()?;

    if values.is_empty() || raw.trim().is_empty() {
        return Err(SweepError::InvalidValues(
            "sweep value list is empty".to_string(),
        ));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_values_accepts_comma_list() {
        assert_eq!(parse_values("2,4,8").unwrap(), vec![2, 4, 8]);
        assert_eq!(parse_values(" 16 , 32 ").unwrap(), vec![16, 32]);
    }

    #[test]
    fn parse_values_rejects_garbage() {
        assert!(parse_values("").is_err());
        assert!(parse_values("2,four").is_err());
        assert!(parse_values("2,,8").is_err());
    }

    #[test]
    fn policy_defaults_to_fail_fast() {
        let config = SweepConfig::new(vec![1], "params.rs", "^X=.*$", "X={v}");
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn compiled_pattern_rejects_empty_values() {
        let config = SweepConfig::new(vec![], "params.rs", "^X=.*$", "X={v}");
        assert!(matches!(
            config.compiled_pattern(),
            Err(SweepError::InvalidValues(_))
        ));
    }

    #[test]
    fn compiled_pattern_rejects_bad_regex() {
        let config = SweepConfig::new(vec![1], "params.rs", "([", "X={v}");
        assert!(config.compiled_pattern().is_err());
    }

    #[test]
    fn loads_sweep_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "values": [2, 4],
                "config_file": "src/params.rs",
                "pattern": "^pub const SECTORS: usize = .*$",
                "template": "pub const SECTORS: usize = {{v}};",
                "failure_policy": "continue_on_error"
            }}"#
        )
        .unwrap();

        let config = SweepConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.values, vec![2, 4]);
        assert_eq!(config.failure_policy, FailurePolicy::ContinueOnError);
    }
}
