//! Standalone sweep runner binary.
//!
//! `sweep_cli run` patches a config constant for each sweep value and runs
//! the given command, reporting exit status, wall-clock time, and peak
//! memory per step. `sweep_cli plan` prints what a run would do without
//! executing anything.

use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand};
use env_logger::{Env, Target};
use sweep_core::{
    parse_values, render_template, run_sweep_with_interrupt, FailurePolicy, OsSpawner, Step,
    SweepConfig, SweepError,
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Pid of the in-flight child (0 when idle), published by the spawner so the
/// signal handler can forward a signal delivered to the runner alone.
#[cfg(unix)]
static ACTIVE_CHILD: std::sync::atomic::AtomicI32 = std::sync::atomic::AtomicI32::new(0);

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "sweep_cli",
    about = "Benchmark sweep runner: patch a config constant, run a command per value",
    long_about = "For each sweep value, rewrites the one line of --config-file matching\n\
                  --pattern with --template ({v} = current value), then runs the trailing\n\
                  command, logging exit status, elapsed time, and peak memory."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sweep
    Run(SweepArgs),
    /// Print the patch and command each value would run, without executing
    Plan(SweepArgs),
}

#[derive(Args)]
struct SweepArgs {
    /// Comma-separated sweep values, applied in list order
    #[arg(long, value_name = "V1,V2,...")]
    values: String,
    /// File patched in place before each iteration
    #[arg(long, value_name = "PATH")]
    config_file: PathBuf,
    /// Regular expression matching exactly one line of the config file
    #[arg(long, value_name = "REGEX")]
    pattern: String,
    /// Replacement line; {v} becomes the current value
    #[arg(long, value_name = "STR")]
    template: String,
    /// Collect failures and keep sweeping instead of aborting
    #[arg(long)]
    continue_on_error: bool,
    /// Working directory for the command
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,
    /// Extra environment for the command (may repeat)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,
    /// Write per-step results as CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
    /// Write per-step results as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
    /// Command to run per value; {v} in arguments becomes the value
    #[arg(last = true, required = true, value_name = "COMMAND")]
    command: Vec<String>,
}

// ── helpers ────────────────────────────────────────────────────────

fn parse_env_pairs(raw: &[String]) -> Result<Vec<(String, String)>, String> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| format!("--env `{pair}` is not KEY=VALUE"))
        })
        .collect()
}

/// Distinct exit codes per failure kind, for scripting around the runner.
fn exit_code_for(err: &SweepError) -> i32 {
    match err {
        SweepError::ConfigPatch { .. } => 2,
        SweepError::Spawn { .. } => 3,
        SweepError::StepExecution { .. } => 4,
        SweepError::Interrupted { .. } => 5,
        SweepError::InvalidValues(_) | SweepError::Io { .. } => 1,
    }
}

fn steps_for(args: &SweepArgs, env: &[(String, String)], value: u64) -> Vec<Step> {
    let mut step = Step::new(render_template(&args.command[0], value))
        .description(format!("benchmark for value {value}"));
    for arg in &args.command[1..] {
        step = step.arg(render_template(arg, value));
    }
    if let Some(dir) = &args.cwd {
        step = step.cwd(dir);
    }
    for (key, val) in env {
        step = step.env(key, val);
    }
    vec![step]
}

fn build_config(args: &SweepArgs) -> Result<SweepConfig, SweepError> {
    let values = parse_values(&args.values)?;
    let policy = if args.continue_on_error {
        FailurePolicy::ContinueOnError
    } else {
        FailurePolicy::FailFast
    };
    Ok(
        SweepConfig::new(values, &args.config_file, &args.pattern, &args.template)
            .failure_policy(policy),
    )
}

#[cfg(unix)]
fn install_signal_handler() {
    extern "C" fn handle(signo: libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
        let pid = ACTIVE_CHILD.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe { libc::kill(pid, signo) };
        }
    }
    unsafe {
        libc::signal(
            libc::SIGINT,
            handle as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGTERM,
            handle as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
}

#[cfg(not(unix))]
fn install_signal_handler() {}

// ── commands ───────────────────────────────────────────────────────

fn run_command(args: &SweepArgs) -> i32 {
    let env = match parse_env_pairs(&args.env) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    let config = match build_config(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };

    install_signal_handler();
    #[cfg(unix)]
    let spawner = OsSpawner::default().track_child(&ACTIVE_CHILD);
    #[cfg(not(unix))]
    let spawner = OsSpawner::default();
    let report = match run_sweep_with_interrupt(
        &config,
        |value| steps_for(args, &env, value),
        &spawner,
        &INTERRUPTED,
        !args.no_progress,
    ) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_code_for(&err);
        }
    };

    print!("{}", report.summary());
    if let Some(path) = &args.csv {
        if let Err(err) = report.export_to_csv(path) {
            eprintln!("error: failed to write {}: {err}", path.display());
            return 1;
        }
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.json {
        if let Err(err) = report.export_to_json(path) {
            eprintln!("error: failed to write {}: {err}", path.display());
            return 1;
        }
        log::info!("wrote {}", path.display());
    }

    if report.is_success() {
        0
    } else {
        // Continue-on-error collected at least one failure.
        4
    }
}

fn plan_command(args: &SweepArgs) -> i32 {
    let env = match parse_env_pairs(&args.env) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    let config = match build_config(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    if let Err(err) = config.compiled_pattern() {
        eprintln!("error: {err}");
        return 1;
    }

    for &value in &config.values {
        println!(
            "value={value}: patch {} -> `{}`",
            config.config_file.display(),
            render_template(&config.template, value)
        );
        for (index, step) in steps_for(args, &env, value).iter().enumerate() {
            println!("value={value} step={}: {}", index + 1, step.command_line());
        }
    }
    0
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .init();

    let cli = Cli::parse();
    let code = match &cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Plan(args) => plan_command(args),
    };
    exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep_args(command: Vec<&str>) -> SweepArgs {
        SweepArgs {
            values: "2,4".to_string(),
            config_file: PathBuf::from("params.rs"),
            pattern: "^X=.*$".to_string(),
            template: "X={v}".to_string(),
            continue_on_error: false,
            cwd: None,
            env: vec![],
            csv: None,
            json: None,
            no_progress: true,
            command: command.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn env_pairs_require_key_value_shape() {
        let pairs =
            parse_env_pairs(&["RUST_LOG=info".to_string(), "BACKTRACE=1".to_string()]).unwrap();
        assert_eq!(pairs[0], ("RUST_LOG".to_string(), "info".to_string()));
        assert_eq!(pairs.len(), 2);

        assert!(parse_env_pairs(&["NOEQUALS".to_string()]).is_err());
    }

    #[test]
    fn command_args_substitute_current_value() {
        let args = sweep_args(vec!["benchy", "--sectors", "{v}"]);
        let steps = steps_for(&args, &[], 8);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].command_line(), "benchy --sectors 8");
    }

    #[test]
    fn exit_codes_are_distinct_per_failure_kind() {
        let patch = SweepError::ConfigPatch {
            path: PathBuf::from("params.rs"),
            pattern: "^X=".to_string(),
            matches: 0,
            value: 2,
        };
        let spawn = SweepError::Spawn {
            program: "benchy".to_string(),
            value: 2,
            step: 1,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let exec = SweepError::StepExecution {
            value: 2,
            step: 1,
            exit_code: 1,
        };
        let interrupted = SweepError::Interrupted {
            value: 2,
            step: None,
        };

        assert_eq!(exit_code_for(&patch), 2);
        assert_eq!(exit_code_for(&spawn), 3);
        assert_eq!(exit_code_for(&exec), 4);
        assert_eq!(exit_code_for(&interrupted), 5);
    }

    #[test]
    fn continue_on_error_flag_selects_policy() {
        let mut args = sweep_args(vec!["true"]);
        assert_eq!(
            build_config(&args).unwrap().failure_policy,
            FailurePolicy::FailFast
        );
        args.continue_on_error = true;
        assert_eq!(
            build_config(&args).unwrap().failure_policy,
            FailurePolicy::ContinueOnError
        );
    }
}
