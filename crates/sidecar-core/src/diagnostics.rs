//! Best-effort classification of a failed startup from captured stderr.
//!
//! The pre-spawn port probe is the authoritative conflict check. This module
//! only enriches the message when the server died on its own, so every match
//! here is advisory.

use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Upper bound on buffered stderr, in bytes. Oldest lines are dropped first.
const MAX_BUFFER_BYTES: usize = 64 * 1024;

/// Number of trailing stderr lines quoted in an early-exit message.
pub const TAIL_LINES: usize = 5;

static PORT_IN_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:address|port)\b[^\n]*\balready in use\b)|\beaddrinuse\b")
        .expect("port-in-use pattern is valid")
});

static LOG_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\blog file at\s+["'`]?([^\s"'`]+)"#).expect("log-file pattern is valid")
});

/// Stderr captured during one start attempt.
#[derive(Debug, Default, Clone)]
pub struct StderrBuffer {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line (without trailing newline).
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.bytes += line.len();
        self.lines.push_back(line);

        while self.bytes > MAX_BUFFER_BYTES && self.lines.len() > 1 {
            if let Some(dropped) = self.lines.pop_front() {
                self.bytes -= dropped.len();
            }
        }
    }

    /// Last `n` non-blank lines, oldest first.
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<String> {
        let mut tail: Vec<String> = self
            .lines
            .iter()
            .rev()
            .filter(|line| !line.trim().is_empty())
            .take(n)
            .map(|line| line.trim_end().to_string())
            .collect();
        tail.reverse();
        tail
    }

    /// Whole buffer joined with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Explanation of a nonzero exit during startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code reported by the OS.
    pub code: i32,
    /// Port the server was asked to listen on.
    pub port: u16,
    /// Stderr suggests the port was taken.
    pub port_conflict: bool,
    /// Trailing stderr lines, oldest first.
    pub tail: Vec<String>,
    /// Log file path advertised by the server, if any.
    pub log_file: Option<String>,
}

impl ExitReport {
    /// Build a report from the stderr captured during the attempt.
    #[must_use]
    pub fn from_stderr(code: i32, port: u16, stderr: &StderrBuffer) -> Self {
        let text = stderr.text();
        Self {
            code,
            port,
            port_conflict: mentions_port_in_use(&text),
            tail: stderr.tail(TAIL_LINES),
            log_file: find_log_file(&text),
        }
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process exited unexpectedly (exit code {})", self.code)?;

        if self.port_conflict {
            return write!(
                f,
                ": port {} is already in use. {}",
                self.port,
                port_conflict_hint()
            );
        }

        for line in &self.tail {
            write!(f, "\n{line}")?;
        }
        if let Some(ref path) = self.log_file {
            write!(f, "\nCheck the log file at {path}")?;
        }
        Ok(())
    }
}

/// Remediation shared by every port-conflict message.
#[must_use]
pub const fn port_conflict_hint() -> &'static str {
    "Stop the other process using it or choose a different port in settings."
}

/// Whether `text` looks like an "address/port already in use" failure.
#[must_use]
pub fn mentions_port_in_use(text: &str) -> bool {
    PORT_IN_USE.is_match(text)
}

/// Extract the path from a "log file at <path>" line.
#[must_use]
pub fn find_log_file(text: &str) -> Option<String> {
    LOG_FILE
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', ')']).to_string())
        .filter(|path| !path.is_empty())
}
