//! Process execution: the `Spawn` seam plus the OS-backed spawner.
//!
//! The runner talks to external tools only through the [`Spawn`] trait so
//! tests can substitute a fake spawner. [`OsSpawner`] blocks until the child
//! exits and records wall-clock time plus peak resident memory from the
//! kernel's per-child resource accounting (`wait4` rusage on Unix).

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::step::Step;

/// What one finished step reported.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Child exit code. A signal-terminated child reports `128 + signo`.
    pub exit_code: i32,
    /// Wall-clock time from spawn to exit.
    pub elapsed: Duration,
    /// Peak resident memory in KiB, when the platform reports it.
    pub max_rss_kib: Option<u64>,
    /// Captured standard output (diagnostics only).
    pub stdout: String,
    /// Captured standard error (diagnostics only).
    pub stderr: String,
}

impl StepOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// `4096KB`, or `n/a` where the platform gives no accounting.
    pub fn max_rss_display(&self) -> String {
        match self.max_rss_kib {
            Some(kib) => format!("{kib}KB"),
            None => "n/a".to_string(),
        }
    }
}

/// Spawns a step and blocks until it exits.
pub trait Spawn {
    fn run(&self, step: &Step) -> io::Result<StepOutcome>;
}

/// Real spawner backed by `std::process::Command`. Children inherit the
/// parent environment (plus step overrides) and the parent's process group,
/// so terminal-delivered signals reach them directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSpawner {
    child_tracker: Option<&'static AtomicI32>,
}

impl OsSpawner {
    /// Publish the active child's pid in `tracker` while a step runs (0 when
    /// idle), so a signal handler can forward a termination signal sent to
    /// the runner alone. The runner executes one step at a time, so a single
    /// slot suffices.
    pub fn track_child(mut self, tracker: &'static AtomicI32) -> Self {
        self.child_tracker = Some(tracker);
        self
    }
}

impl Spawn for OsSpawner {
    fn run(&self, step: &Step) -> io::Result<StepOutcome> {
        let mut command = Command::new(&step.program);
        command
            .args(&step.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &step.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &step.env {
            command.env(key, value);
        }

        let start = Instant::now();
        let mut child = command.spawn()?;
        if let Some(tracker) = self.child_tracker {
            tracker.store(child.id() as i32, Ordering::SeqCst);
        }

        // Drain both pipes before reaping so a chatty child cannot block on
        // a full pipe buffer.
        let stderr_pipe = child.stderr.take();
        let stderr_reader = thread::spawn(move || read_pipe(stderr_pipe));
        let stdout = read_pipe(child.stdout.take());
        let stderr = stderr_reader.join().unwrap_or_default();

        let reaped = reap(&mut child);
        if let Some(tracker) = self.child_tracker {
            tracker.store(0, Ordering::SeqCst);
        }
        let (exit_code, max_rss_kib) = reaped?;
        let elapsed = start.elapsed();

        Ok(StepOutcome {
            exit_code,
            elapsed,
            max_rss_kib,
            stdout,
            stderr,
        })
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Reap the child with `wait4`, returning its exit code and peak RSS in KiB.
#[cfg(unix)]
fn reap(child: &mut Child) -> io::Result<(i32, Option<u64>)> {
    let pid = child.id() as libc::pid_t;
    let mut status: libc::c_int = 0;
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    loop {
        let rc = unsafe { libc::wait4(pid, &mut status, 0, &mut usage) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        break;
    }

    let exit_code = if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        128 + libc::WTERMSIG(status)
    } else {
        -1
    };

    // ru_maxrss is KiB on Linux, bytes on macOS.
    let raw = usage.ru_maxrss as i64;
    let max_rss_kib = if cfg!(target_os = "macos") {
        raw / 1024
    } else {
        raw
    };

    Ok((exit_code, u64::try_from(max_rss_kib).ok()))
}

#[cfg(not(unix))]
fn reap(child: &mut Child) -> io::Result<(i32, Option<u64>)> {
    let status = child.wait()?;
    Ok((status.code().unwrap_or(-1), None))
}
