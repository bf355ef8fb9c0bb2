//! Error taxonomy for the sweep runner.
//!
//! Every error names the sweep value (and step, where one exists) that
//! triggered it so operators can resume a sweep by hand after a failure.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors surfaced while executing a sweep.
#[derive(Debug)]
pub enum SweepError {
    /// The config-file pattern matched zero lines or more than one line.
    ConfigPatch {
        path: PathBuf,
        pattern: String,
        matches: usize,
        value: u64,
    },
    /// The step's executable was missing or could not be spawned.
    Spawn {
        program: String,
        value: u64,
        step: usize,
        source: io::Error,
    },
    /// A step exited with a non-zero status.
    StepExecution {
        value: u64,
        step: usize,
        exit_code: i32,
    },
    /// The runner received a termination signal mid-sweep.
    Interrupted { value: u64, step: Option<usize> },
    /// The sweep value list was empty or could not be parsed.
    InvalidValues(String),
    /// Reading or rewriting the config file failed. `value` is set when the
    /// failure happened inside an iteration's patch.
    Io {
        value: Option<u64>,
        source: io::Error,
    },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::ConfigPatch {
                path,
                pattern,
                matches,
                value,
            } => write!(
                f,
                "value={value}: pattern `{pattern}` matched {matches} lines in {} (expected exactly 1)",
                path.display()
            ),
            SweepError::Spawn {
                program,
                value,
                step,
                source,
            } => write!(
                f,
                "value={value} step={step}: failed to spawn `{program}`: {source}"
            ),
            SweepError::StepExecution {
                value,
                step,
                exit_code,
            } => write!(f, "value={value} step={step}: exited with code {exit_code}"),
            SweepError::Interrupted { value, step } => match step {
                Some(step) => write!(f, "value={value} step={step}: sweep interrupted"),
                None => write!(f, "value={value}: sweep interrupted"),
            },
            SweepError::InvalidValues(reason) => write!(f, "invalid sweep values: {reason}"),
            SweepError::Io {
                value: Some(value),
                source,
            } => write!(f, "value={value}: config file I/O failed: {source}"),
            SweepError::Io {
                value: None,
                source,
            } => write!(f, "config file I/O failed: {source}"),
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::Spawn { source, .. } => Some(source),
            SweepError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for SweepError {
    fn from(err: io::Error) -> Self {
        SweepError::Io {
            value: None,
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_value_and_step() {
        let err = SweepError::StepExecution {
            value: 8,
            step: 2,
            exit_code: 101,
        };
        assert_eq!(err.to_string(), "value=8 step=2: exited with code 101");
    }

    #[test]
    fn display_reports_ambiguous_patch() {
        let err = SweepError::ConfigPatch {
            path: PathBuf::from("params.rs"),
            pattern: "^X=".to_string(),
            matches: 3,
            value: 4,
        };
        let text = err.to_string();
        assert!(text.contains("matched 3 lines"));
        assert!(text.contains("params.rs"));
    }

    #[test]
    fn io_failure_inside_an_iteration_names_the_value() {
        let err = SweepError::Io {
            value: Some(8),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().starts_with("value=8: "));

        let outside: SweepError =
            io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(outside, SweepError::Io { value: None, .. }));
        assert!(!outside.to_string().contains("value="));
    }
}
