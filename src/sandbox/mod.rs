//! Sandboxed code execution. Snippets run in a short-lived interpreter
//! subprocess against a fixed set of helper bindings. Whatever happens in
//! there (syntax errors, missing names, a missing interpreter, a hang)
//! comes back to the caller as a string; `execute` never fails outward.

use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Maximum characters returned from one execution.
pub const OUTPUT_LIMIT: usize = 2000;
pub const TRUNCATION_MARKER: &str = "\n[Output truncated due to context limits...]";
const EMPTY_OUTPUT_FALLBACK: &str = "Execution completed.";
const ERROR_PREFIX: &str = "Error executing code:";

/// Harness run as `<interpreter> harness.py snippet.py`. Binds the fixed
/// helper names, captures stdout, prefers a `result` binding over printed
/// text, and converts snippet exceptions into the error-string shape.
const HARNESS_SOURCE: &str = r#"import io
import sys
from contextlib import redirect_stdout


def main() -> int:
    snippet_path = sys.argv[1]
    with open(snippet_path, "r", encoding="utf-8") as fh:
        source = fh.read()

    buffer = io.StringIO()
    try:
        import sqlite3

        import numpy as np
        import pandas as pd
        import matplotlib

        matplotlib.use("Agg")
        import matplotlib.pyplot as plt
        import seaborn as sns
        from scipy import stats

        scope = {
            "pd": pd,
            "np": np,
            "plt": plt,
            "sns": sns,
            "sqlite3": sqlite3,
            "stats": stats,
        }
        with redirect_stdout(buffer):
            exec(compile(source, snippet_path, "exec"), scope)
    except Exception as exc:
        print(f"Error executing code: {exc}")
        return 0

    printed = buffer.getvalue().strip()
    value = scope.get("result", printed)
    text = "" if value is None else str(value)
    if text:
        print(text)
    return 0


if __name__ == "__main__":
    sys.exit(main())
"#;

#[derive(Debug, thiserror::Error)]
enum SandboxFailure {
    #[error("interpreter `{0}` not found")]
    MissingInterpreter(String),
    #[error("execution timed out after {0}s")]
    Timeout(u64),
    #[error("{0}")]
    Interpreter(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path, source: std::io::Error) -> SandboxFailure {
    SandboxFailure::Io {
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub interpreter: String,
    pub timeout: Duration,
    pub scratch_root: PathBuf,
}

impl SandboxConfig {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout: Duration::from_secs(120),
            scratch_root: scratch_root.into(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CodeSandbox {
    config: SandboxConfig,
}

impl CodeSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Runs one snippet and returns its output text. Every failure mode is
    /// folded into the returned string; callers get exactly one of: the
    /// snippet's `result` binding, its captured stdout, the empty-output
    /// fallback, or an `Error executing code:` line.
    pub fn execute(&self, code: &str) -> String {
        let raw = match self.run_snippet(code) {
            Ok(stdout) => stdout,
            Err(failure) => format!("{ERROR_PREFIX} {failure}"),
        };
        finalize_output(&raw)
    }

    fn run_snippet(&self, code: &str) -> Result<String, SandboxFailure> {
        let exec_dir = self.config.scratch_root.join("exec");
        fs::create_dir_all(&exec_dir).map_err(|e| io_error(&exec_dir, e))?;

        let harness_path = exec_dir.join("harness.py");
        fs::write(&harness_path, HARNESS_SOURCE).map_err(|e| io_error(&harness_path, e))?;
        let snippet_path = exec_dir.join(format!("snippet-{}.py", now_nanos()));
        fs::write(&snippet_path, code).map_err(|e| io_error(&snippet_path, e))?;

        let mut child = match Command::new(&self.config.interpreter)
            .arg(&harness_path)
            .arg(&snippet_path)
            .current_dir(&self.config.scratch_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let _ = fs::remove_file(&snippet_path);
                return Err(SandboxFailure::MissingInterpreter(
                    self.config.interpreter.clone(),
                ));
            }
            Err(err) => {
                let _ = fs::remove_file(&snippet_path);
                return Err(io_error(&self.config.scratch_root, err));
            }
        };

        let stdout = child.stdout.take().ok_or_else(|| {
            io_error(
                &self.config.scratch_root,
                std::io::Error::other("missing stdout pipe"),
            )
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            io_error(
                &self.config.scratch_root,
                std::io::Error::other("missing stderr pipe"),
            )
        })?;

        let stdout_reader = thread::spawn(move || {
            let mut buf = String::new();
            let mut reader = BufReader::new(stdout);
            let _ = reader.read_to_string(&mut buf);
            buf
        });
        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_string(&mut buf);
            buf
        });

        let start = Instant::now();
        let exit_status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.config.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stdout_reader.join();
                        let _ = stderr_reader.join();
                        let _ = fs::remove_file(&snippet_path);
                        return Err(SandboxFailure::Timeout(self.config.timeout.as_secs()));
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(err) => {
                    let _ = fs::remove_file(&snippet_path);
                    return Err(io_error(&self.config.scratch_root, err));
                }
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        let _ = fs::remove_file(&snippet_path);

        if !exit_status.success() {
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(|line| line.trim().to_string())
                .unwrap_or_else(|| {
                    format!("interpreter exited with code {}", exit_status.code().unwrap_or(-1))
                });
            return Err(SandboxFailure::Interpreter(detail));
        }

        Ok(stdout)
    }
}

/// Applies the empty-output fallback and the size cap.
fn finalize_output(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return EMPTY_OUTPUT_FALLBACK.to_string();
    }
    if trimmed.chars().count() > OUTPUT_LIMIT {
        let mut capped: String = trimmed.chars().take(OUTPUT_LIMIT).collect();
        capped.push_str(TRUNCATION_MARKER);
        return capped;
    }
    trimmed.to_string()
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_falls_back_on_empty_output() {
        assert_eq!(finalize_output(""), "Execution completed.");
        assert_eq!(finalize_output("  \n "), "Execution completed.");
    }

    #[test]
    fn finalize_caps_output_and_appends_marker() {
        let long = "x".repeat(OUTPUT_LIMIT + 50);
        let capped = finalize_output(&long);
        assert!(capped.starts_with(&"x".repeat(OUTPUT_LIMIT)));
        assert!(capped.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            capped.chars().count(),
            OUTPUT_LIMIT + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn finalize_keeps_short_output_verbatim() {
        assert_eq!(finalize_output("10\n"), "10");
    }

    #[test]
    fn harness_binds_the_fixed_helper_names_and_prefers_result() {
        for binding in ["\"pd\": pd", "\"np\": np", "\"plt\": plt", "\"sns\": sns", "\"sqlite3\": sqlite3", "\"stats\": stats"] {
            assert!(HARNESS_SOURCE.contains(binding), "missing {binding}");
        }
        assert!(HARNESS_SOURCE.contains("scope.get(\"result\", printed)"));
        assert!(HARNESS_SOURCE.contains("Error executing code:"));
    }
}
