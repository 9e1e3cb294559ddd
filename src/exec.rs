use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

/// Terminal state of one external tool invocation. A wall-clock expiry is a
/// distinct state, never conflated with an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Exit(i32),
    TimedOut,
}

impl ExecStatus {
    pub fn success(self) -> bool {
        matches!(self, ExecStatus::Exit(0))
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecStatus::Exit(code) => write!(f, "{code}"),
            ExecStatus::TimedOut => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub status: ExecStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout followed by stderr, the diagnostic blob recorded in reports.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Run `program` with `args` in `cwd`, capturing all output.
pub fn run(program: &str, args: &[String], cwd: &Path) -> Result<ExecOutput> {
    run_inner(program, args, cwd, None)
}

/// Like [`run`], but kill the child once `timeout` elapses. Output produced
/// before the kill is still captured.
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<ExecOutput> {
    run_inner(program, args, cwd, Some(timeout))
}

fn run_inner(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
) -> Result<ExecOutput> {
    // The working directory is passed to the spawn call; the parent process
    // never chdirs, so concurrent invocations cannot interfere.
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {program}"))?;
    let start = Instant::now();

    // Drain both pipes on their own threads so a chatty child cannot fill a
    // pipe buffer and deadlock against our wait loop.
    let out_handle = drain(child.stdout.take());
    let err_handle = drain(child.stderr.take());

    let exit = loop {
        if let Some(status) = child.try_wait().context("wait for child")? {
            break Some(status);
        }
        if let Some(limit) = timeout
            && start.elapsed() >= limit
        {
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    let elapsed = start.elapsed();

    let stdout = String::from_utf8_lossy(&out_handle.join().unwrap_or_default()).into_owned();
    let stderr = String::from_utf8_lossy(&err_handle.join().unwrap_or_default()).into_owned();

    let status = match exit {
        Some(st) => ExecStatus::Exit(st.code().unwrap_or(-1)),
        None => ExecStatus::TimedOut,
    };
    Ok(ExecOutput {
        status,
        stdout,
        stderr,
        elapsed,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        buf
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_formats_timeout_as_sentinel() {
        assert_eq!(ExecStatus::Exit(0).to_string(), "0");
        assert_eq!(ExecStatus::Exit(127).to_string(), "127");
        assert_eq!(ExecStatus::TimedOut.to_string(), "timeout");
        assert!(!ExecStatus::TimedOut.success());
    }

    #[cfg(unix)]
    #[test]
    fn captures_combined_output_and_exit_code() {
        let out = run(
            "sh",
            &[
                "-c".to_string(),
                "echo out; echo err >&2; exit 3".to_string(),
            ],
            Path::new("."),
        )
        .unwrap();
        assert_eq!(out.status, ExecStatus::Exit(3));
        assert_eq!(out.combined(), "out\nerr\n");
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_and_reports_sentinel() {
        let out = run_with_timeout(
            "sh",
            &["-c".to_string(), "echo started; exec sleep 30".to_string()],
            Path::new("."),
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(out.status, ExecStatus::TimedOut);
        assert!(out.stdout.contains("started"));
        assert!(out.elapsed < Duration::from_secs(10));
    }
}
