//! The sweep runner: patch the config file, then run the value's steps.
//!
//! Execution is strictly sequential. Values are processed in list order, and
//! within a value each step blocks until its child exits; the next iteration
//! depends on the file patch, and later steps may depend on earlier steps'
//! build output. Steps are numbered from 1 in logs, records, and errors.

use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{FailurePolicy, SweepConfig};
use crate::error::SweepError;
use crate::patch::{patch_line, render_template};
use crate::process::Spawn;
use crate::report::{StepRecord, SweepReport};
use crate::step::Step;

/// Run the sweep without interruption support or a progress bar.
///
/// See [`run_sweep_with_interrupt`] for the full contract.
pub fn run_sweep<S, F>(
    config: &SweepConfig,
    step_fn: F,
    spawner: &S,
) -> Result<SweepReport, SweepError>
where
    S: Spawn,
    F: FnMut(u64) -> Vec<Step>,
{
    run_sweep_with_interrupt(config, step_fn, spawner, &AtomicBool::new(false), false)
}

/// Run the sweep: for each value in order, patch the config file, then
/// execute the steps `step_fn` produces for that value.
///
/// Under the default fail-fast policy the first failure aborts the whole
/// sweep with the triggering error. Under continue-on-error the failure is
/// collected in the report, the rest of that value's steps are skipped, and
/// the sweep proceeds to the next value.
///
/// The `interrupt` flag is checked before each patch and each step; once set
/// (by a signal handler, typically) the runner stops at that boundary with
/// [`SweepError::Interrupted`]. In-flight children are not killed here;
/// terminal signals reach them through the shared process group, and
/// [`OsSpawner::track_child`](crate::process::OsSpawner::track_child) lets a
/// handler forward a signal delivered to the runner alone.
pub fn run_sweep_with_interrupt<S, F>(
    config: &SweepConfig,
    mut step_fn: F,
    spawner: &S,
    interrupt: &AtomicBool,
    show_progress: bool,
) -> Result<SweepReport, SweepError>
where
    S: Spawn,
    F: FnMut(u64) -> Vec<Step>,
{
    let pattern = config.compiled_pattern()?;

    let bar = if show_progress {
        let bar = ProgressBar::new(config.values.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(bar)
    } else {
        None
    };

    let mut report = SweepReport::default();
    'values: for &value in &config.values {
        if interrupt.load(Ordering::SeqCst) {
            return Err(SweepError::Interrupted { value, step: None });
        }

        log::info!(
            "value={value}: patching {} -> `{}`",
            config.config_file.display(),
            render_template(&config.template, value)
        );
        match patch_line(&config.config_file, &pattern, &config.template, value) {
            Ok(outcome) => {
                log::info!("value={value}: rewrote line {}", outcome.line_number);
            }
            Err(err) => match config.failure_policy {
                FailurePolicy::FailFast => return Err(err),
                FailurePolicy::ContinueOnError => {
                    log::warn!("{err}");
                    report.failures.push(err);
                    if let Some(bar) = &bar {
                        bar.inc(1);
                    }
                    continue 'values;
                }
            },
        }

        let steps = step_fn(value);
        for (index, step) in steps.iter().enumerate() {
            let step_no = index + 1;
            if interrupt.load(Ordering::SeqCst) {
                return Err(SweepError::Interrupted {
                    value,
                    step: Some(step_no),
                });
            }

            log::info!(
                "value={value} step={step_no}: {} ({})",
                step.description,
                step.command_line()
            );
            let outcome = match spawner.run(step) {
                Ok(outcome) => outcome,
                Err(source) => {
                    let err = SweepError::Spawn {
                        program: step.program.clone(),
                        value,
                        step: step_no,
                        source,
                    };
                    match config.failure_policy {
                        FailurePolicy::FailFast => return Err(err),
                        FailurePolicy::ContinueOnError => {
                            log::warn!("{err}");
                            report.failures.push(err);
                            if let Some(bar) = &bar {
                                bar.inc(1);
                            }
                            continue 'values;
                        }
                    }
                }
            };

            log::info!(
                "value={value} step={step_no} exit={} elapsed={:.1}s maxmem={}",
                outcome.exit_code,
                outcome.elapsed.as_secs_f64(),
                outcome.max_rss_display()
            );
            let exit_code = outcome.exit_code;
            report.records.push(StepRecord {
                value,
                step: step_no,
                description: step.description.clone(),
                outcome,
            });

            if exit_code != 0 {
                let err = SweepError::StepExecution {
                    value,
                    step: step_no,
                    exit_code,
                };
                match config.failure_policy {
                    FailurePolicy::FailFast => return Err(err),
                    FailurePolicy::ContinueOnError => {
                        log::warn!("{err}");
                        report.failures.push(err);
                        if let Some(bar) = &bar {
                            bar.inc(1);
                        }
                        continue 'values;
                    }
                }
            }
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = &bar {
        bar.finish_with_message("sweep complete");
    }
    Ok(report)
}
