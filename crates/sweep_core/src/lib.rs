//! Benchmark sweep runner: patch a config constant, run external build and
//! benchmark commands, and record timing plus peak memory per step.
//!
//! For each value in a configured parameter list the runner rewrites one line
//! of a target file so a named constant takes that value, then executes the
//! external commands for that value sequentially, capturing exit status,
//! wall-clock time, and peak resident memory.
//!
//! # Quick Start
//!
//! ```no_run
//! use sweep_core::{run_sweep, OsSpawner, Step, SweepConfig};
//!
//! let config = SweepConfig::new(
//!     vec![2, 4, 8],
//!     "src/params.rs",
//!     r"^pub const SECTOR_COUNT: usize = .*$",
//!     "pub const SECTOR_COUNT: usize = {v};",
//! );
//!
//! let report = run_sweep(
//!     &config,
//!     |value| {
//!         vec![
//!             Step::new("cargo")
//!                 .args(["run", "--release", "--bin", "paramcache"])
//!                 .description(format!("parameter cache for {value} sectors")),
//!             Step::new("cargo")
//!                 .args(["run", "--release", "--bin", "benchy"])
//!                 .env("RUST_LOG", "info")
//!                 .description(format!("sealing benchmark for {value} sectors")),
//!         ]
//!     },
//!     &OsSpawner::default(),
//! )?;
//! println!("{}", report.summary());
//! # Ok::<(), sweep_core::SweepError>(())
//! ```
//!
//! # Architecture
//!
//! - [`config`]: the sweep axis, patch target, and failure policy
//! - [`patch`]: in-place single-line config-file rewriting
//! - [`step`]: the external-command abstraction
//! - [`process`]: the `Spawn` seam and the OS-backed spawner
//! - [`runner`]: the sequential patch-then-run loop
//! - [`report`]: step records and CSV/JSON export

pub mod config;
pub mod error;
pub mod patch;
pub mod process;
pub mod report;
pub mod runner;
pub mod step;

pub use config::{parse_values, FailurePolicy, SweepConfig};
pub use error::SweepError;
pub use patch::{patch_line, render_template, PatchOutcome};
pub use process::{OsSpawner, Spawn, StepOutcome};
pub use report::{StepRecord, SweepReport};
pub use runner::{run_sweep, run_sweep_with_interrupt};
pub use step::Step;
