use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Poll interval while waiting for a filter process to exit
const EXIT_POLL: Duration = Duration::from_millis(10);

const DEFAULT_DECISION: &str = "pass";
const DEFAULT_REASON: &str = "No matching pattern";
const DENY: &str = "deny";

/// Outcome of checking a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: String,
}

impl Verdict {
    fn allow(reason: impl Into<String>) -> Self {
        Verdict {
            allowed: true,
            reason: reason.into(),
        }
    }
}

/// Something that can decide whether a path may be accessed
pub trait PathJudge {
    fn judge(&self, path: &str) -> Verdict;
}

/// Ways the filter invocation itself can fail. All of them fail open;
/// the Display text becomes the verdict reason.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Filter not installed")]
    NotInstalled,
    #[error("Filter timed out")]
    TimedOut,
    #[error("Filter unavailable")]
    Unavailable(#[source] io::Error),
}

/// Judges paths by running `<program> --check <path>`
#[derive(Debug, Clone)]
pub struct FilterCli {
    program: String,
    timeout: Duration,
}

impl FilterCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        FilterCli {
            program: program.into(),
            timeout,
        }
    }

    /// Run the filter for one path and return its stdout.
    fn run(&self, path: &str) -> Result<String, FilterError> {
        let deadline = Instant::now() + self.timeout;

        let mut child = Command::new(&self.program)
            .arg("--check")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FilterError::NotInstalled,
                _ => FilterError::Unavailable(e),
            })?;

        let Some(mut stdout) = child.stdout.take() else {
            kill(&mut child);
            return Err(FilterError::Unavailable(io::Error::other(
                "filter stdout was not captured",
            )));
        };

        // Drain stdout off-thread so the wait below can honour the deadline
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let result = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(result);
        });

        let remaining = deadline.saturating_duration_since(Instant::now());
        let output = match rx.recv_timeout(remaining) {
            Ok(Ok(buf)) => buf,
            Ok(Err(e)) => {
                kill(&mut child);
                return Err(FilterError::Unavailable(e));
            }
            Err(RecvTimeoutError::Timeout) => {
                kill(&mut child);
                return Err(FilterError::TimedOut);
            }
            Err(RecvTimeoutError::Disconnected) => {
                kill(&mut child);
                return Err(FilterError::Unavailable(io::Error::other(
                    "filter output reader exited early",
                )));
            }
        };

        wait_until(&mut child, deadline)?;
        String::from_utf8(output)
            .map_err(|e| FilterError::Unavailable(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

impl PathJudge for FilterCli {
    fn judge(&self, path: &str) -> Verdict {
        match self.run(path) {
            Ok(output) => parse_output(&output),
            Err(e) => {
                tracing::warn!(
                    path,
                    program = %self.program,
                    error = ?e,
                    "filter check failed, allowing"
                );
                Verdict::allow(e.to_string())
            }
        }
    }
}

/// Wait for the child to exit, killing it once the deadline passes.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<(), FilterError> {
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return Ok(()),
            Ok(None) if Instant::now() >= deadline => {
                kill(child);
                return Err(FilterError::TimedOut);
            }
            Ok(None) => thread::sleep(EXIT_POLL),
            Err(e) => {
                kill(child);
                return Err(FilterError::Unavailable(e));
            }
        }
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Parse the filter's `Decision:` / `Reason:` lines.
/// Absent lines fall back to defaults; later lines win.
pub fn parse_output(output: &str) -> Verdict {
    let mut decision = DEFAULT_DECISION;
    let mut reason = DEFAULT_REASON;

    for line in output.lines() {
        if let Some(value) = line.strip_prefix("Decision:") {
            decision = value.trim();
        } else if let Some(value) = line.strip_prefix("Reason:") {
            reason = value.trim();
        }
    }

    Verdict {
        allowed: decision != DENY,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deny_with_reason() {
        let verdict = parse_output("Decision: deny\nReason: credentials file\n");
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, "credentials file");
    }

    #[test]
    fn test_parse_allow() {
        let verdict = parse_output("Path: /tmp/x\nDecision: allow\nReason: not sensitive\n");
        assert!(verdict.allowed);
        assert_eq!(verdict.reason, "not sensitive");
    }

    #[test]
    fn test_parse_empty_defaults() {
        let verdict = parse_output("");
        assert!(verdict.allowed);
        assert_eq!(verdict.reason, "No matching pattern");
    }

    #[test]
    fn test_parse_deny_without_reason_uses_default_reason() {
        let verdict = parse_output("Decision: deny");
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, "No matching pattern");
    }

    #[test]
    fn test_parse_reason_keeps_later_colons() {
        let verdict = parse_output("Decision: deny\nReason: matched: ~/.ssh/*");
        assert_eq!(verdict.reason, "matched: ~/.ssh/*");
    }

    #[test]
    fn test_parse_unknown_keyword_allows() {
        assert!(parse_output("Decision: DENY").allowed);
        assert!(parse_output("Decision: ask").allowed);
        // Indented labels are not recognised
        assert!(parse_output("  Decision: deny").allowed);
    }

    #[test]
    fn test_parse_last_decision_wins() {
        assert!(!parse_output("Decision: allow\nDecision: deny").allowed);
    }

    #[test]
    fn test_missing_program_fails_open() {
        let filter = FilterCli::new(
            "security-filter-hook-no-such-binary",
            Duration::from_secs(5),
        );
        let verdict = filter.judge("/etc/passwd");
        assert!(verdict.allowed);
        assert_eq!(verdict.reason, "Filter not installed");
    }

    #[test]
    fn test_error_reasons() {
        assert_eq!(
            FilterError::NotInstalled.to_string(),
            "Filter not installed"
        );
        assert_eq!(FilterError::TimedOut.to_string(), "Filter timed out");
        assert_eq!(
            FilterError::Unavailable(io::Error::other("boom")).to_string(),
            "Filter unavailable"
        );
    }

    #[cfg(unix)]
    mod unix {
        #![allow(clippy::unwrap_used)]

        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use tempfile::TempDir;

        fn write_script(dir: &Path, body: &str) -> String {
            let path = dir.join("fake-filter");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().to_string()
        }

        #[test]
        fn test_cli_passes_check_flag_and_path() {
            let temp = TempDir::new().unwrap();
            let script = write_script(
                temp.path(),
                r#"if [ "$1" = "--check" ] && [ "$2" = "/home/u/.ssh/id_rsa" ]; then
  echo "Decision: deny"
  echo "Reason: ssh key"
fi"#,
            );

            let verdict = FilterCli::new(script, Duration::from_secs(5))
                .judge("/home/u/.ssh/id_rsa");
            assert_eq!(
                verdict,
                Verdict {
                    allowed: false,
                    reason: "ssh key".to_string()
                }
            );
        }

        #[test]
        fn test_cli_nonzero_exit_still_parsed() {
            let temp = TempDir::new().unwrap();
            let script = write_script(temp.path(), "echo 'Decision: deny'\nexit 1");

            let verdict = FilterCli::new(script, Duration::from_secs(5)).judge("x/y");
            assert!(!verdict.allowed);
        }

        #[test]
        fn test_cli_timeout_fails_open() {
            let temp = TempDir::new().unwrap();
            let script = write_script(temp.path(), "echo 'Decision: deny'\nexec sleep 10");

            let start = Instant::now();
            let verdict = FilterCli::new(script, Duration::from_millis(300)).judge("x/y");
            assert!(verdict.allowed);
            assert_eq!(verdict.reason, "Filter timed out");
            assert!(start.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn test_cli_not_executable_unavailable() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("not-exec");
            fs::write(&path, "Decision: deny\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

            let verdict = FilterCli::new(path.to_string_lossy(), Duration::from_secs(5))
                .judge("x/y");
            assert!(verdict.allowed);
            assert_eq!(verdict.reason, "Filter unavailable");
        }

        #[test]
        fn test_cli_invalid_utf8_output_unavailable() {
            let temp = TempDir::new().unwrap();
            let script = write_script(temp.path(), r"printf 'Decision: deny\n\377\n'");

            let verdict = FilterCli::new(script, Duration::from_secs(5)).judge("x/y");
            assert!(verdict.allowed);
            assert_eq!(verdict.reason, "Filter unavailable");
        }
    }
}
