use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::NotebookError;
use crate::notebook::NotebookExecutor;

/// Runs notebooks through `jupyter nbconvert --execute`, reading the executed
/// document from the child's stdout.
///
/// The command line comes from `JUPYTER_BIN` (default `jupyter`) and may carry
/// leading arguments, e.g. `python3 -m jupyter`.
///
/// The timeout passed to [`NotebookExecutor::execute`] bounds each cell.
/// The run as a whole is unbounded unless [`with_max_runtime`] sets a limit.
///
/// [`with_max_runtime`]: NbconvertExecutor::with_max_runtime
#[derive(Debug, Clone)]
pub struct NbconvertExecutor {
    program: String,
    leading_args: Vec<String>,
    kernel: String,
    max_runtime: Option<Duration>,
}

impl NbconvertExecutor {
    pub fn new(command_line: &str, kernel: impl Into<String>) -> Self {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_else(|| "jupyter".to_string());
        Self {
            program,
            leading_args: parts.collect(),
            kernel: kernel.into(),
            max_runtime: None,
        }
    }

    /// Kills the child once the whole run has taken longer than `limit`.
    pub fn with_max_runtime(mut self, limit: Option<Duration>) -> Self {
        self.max_runtime = limit;
        self
    }

    pub fn max_runtime(&self) -> Option<Duration> {
        self.max_runtime
    }

    /// Builds the executor from `JUPYTER_BIN`.
    pub fn from_env(kernel: impl Into<String>) -> Self {
        let command_line = std::env::var("JUPYTER_BIN").unwrap_or_else(|_| "jupyter".to_string());
        Self::new(&command_line, kernel)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn args(&self, notebook: &Path, cell_timeout: Duration) -> Vec<OsString> {
        // nbconvert takes whole seconds per cell
        let cell_timeout = cell_timeout.as_secs().max(1);

        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.extend(
            [
                "nbconvert".to_string(),
                "--to".to_string(),
                "notebook".to_string(),
                "--execute".to_string(),
                "--stdout".to_string(),
                format!("--ExecutePreprocessor.timeout={cell_timeout}"),
                format!("--ExecutePreprocessor.kernel_name={}", self.kernel),
            ]
            .map(OsString::from),
        );
        args.push(notebook.as_os_str().to_os_string());
        args
    }
}

#[async_trait::async_trait]
impl NotebookExecutor for NbconvertExecutor {
    /// Executes `path` with the notebook's own directory as working directory.
    ///
    /// `cell_timeout` is handed to nbconvert as the per-cell limit. The child
    /// is killed only when the optional whole-run limit elapses.
    async fn execute(&self, path: &Path, cell_timeout: Duration) -> Result<Vec<u8>, NotebookError> {
        let workdir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = path.file_name().map(Path::new).unwrap_or(path);

        let args = self.args(file_name, cell_timeout);
        debug!(program = %self.program, ?args, workdir = %workdir.display(), "Spawning notebook executor");

        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => NotebookError::MissingDependency {
                    program: self.program.clone(),
                    source: e,
                },
                _ => NotebookError::Io(e),
            })?;

        // dropping the wait future drops the child, and kill_on_drop ends it
        let output = match self.max_runtime {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => return Err(NotebookError::Timeout(limit)),
            },
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            return Err(NotebookError::ExecutionFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_carry_timeout_and_kernel() {
        let executor = NbconvertExecutor::new("jupyter", "python3");
        let args = executor.args(Path::new("nb.ipynb"), Duration::from_secs(1800));

        assert_eq!(args[0], "nbconvert");
        assert!(args.contains(&OsString::from("--execute")));
        assert!(args.contains(&OsString::from("--ExecutePreprocessor.timeout=1800")));
        assert!(args.contains(&OsString::from("--ExecutePreprocessor.kernel_name=python3")));
        assert_eq!(args.last().unwrap(), "nb.ipynb");
    }

    #[test]
    fn test_command_line_with_leading_args() {
        let executor = NbconvertExecutor::new("python3 -m jupyter", "ir");
        let args = executor.args(Path::new("nb.ipynb"), Duration::from_millis(10));

        assert_eq!(executor.program(), "python3");
        assert_eq!(args[0], "-m");
        assert_eq!(args[1], "jupyter");
        assert_eq!(args[2], "nbconvert");
        assert!(args.contains(&OsString::from("--ExecutePreprocessor.timeout=1")));
        assert!(args.contains(&OsString::from("--ExecutePreprocessor.kernel_name=ir")));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_missing_dependency() {
        let executor = NbconvertExecutor::new("battery-leadtime-no-such-jupyter", "python3");
        let err = executor
            .execute(Path::new("nb.ipynb"), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, NotebookError::MissingDependency { .. }));
        assert!(err.to_string().contains("pip install jupyter nbconvert ipykernel"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn fake_jupyter(dir: &Path, script: &str) -> NbconvertExecutor {
            let path = dir.join("fake_jupyter.sh");
            std::fs::write(&path, script).unwrap();
            NbconvertExecutor::new(&format!("sh {}", path.display()), "python3")
        }

        #[tokio::test]
        async fn test_stdout_is_returned() {
            let dir = tempfile::tempdir().unwrap();
            let notebook = dir.path().join("nb.ipynb");
            std::fs::write(&notebook, r#"{"nbformat": 4, "cells": []}"#).unwrap();
            // prints the last argument, resolved against the working directory
            let executor = fake_jupyter(
                dir.path(),
                "for arg in \"$@\"; do last=\"$arg\"; done\ncat \"$last\"\n",
            );

            let bytes = executor
                .execute(&notebook, Duration::from_secs(10))
                .await
                .unwrap();

            assert_eq!(bytes, br#"{"nbformat": 4, "cells": []}"#);
        }

        #[tokio::test]
        async fn test_non_zero_exit_is_an_execution_failure() {
            let dir = tempfile::tempdir().unwrap();
            let executor = fake_jupyter(dir.path(), "echo 'CellExecutionError: boom' >&2\nexit 3\n");

            let err = executor
                .execute(&dir.path().join("nb.ipynb"), Duration::from_secs(10))
                .await
                .unwrap_err();

            match err {
                NotebookError::ExecutionFailed { stderr, .. } => {
                    assert_eq!(stderr, "CellExecutionError: boom")
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_run_longer_than_cell_timeout_succeeds() {
            let dir = tempfile::tempdir().unwrap();
            let notebook = dir.path().join("nb.ipynb");
            std::fs::write(&notebook, r#"{"nbformat": 4, "cells": []}"#).unwrap();
            // three "cells" that each fit the one-second cell limit
            let executor = fake_jupyter(
                dir.path(),
                "for i in 1 2 3; do sleep 0.6; done\nfor arg in \"$@\"; do last=\"$arg\"; done\ncat \"$last\"\n",
            );

            let bytes = executor
                .execute(&notebook, Duration::from_secs(1))
                .await
                .unwrap();

            assert_eq!(bytes, br#"{"nbformat": 4, "cells": []}"#);
        }

        #[tokio::test]
        async fn test_max_runtime_kills_slow_run() {
            let dir = tempfile::tempdir().unwrap();
            let executor = fake_jupyter(dir.path(), "sleep 5\n")
                .with_max_runtime(Some(Duration::from_millis(200)));

            let err = executor
                .execute(&dir.path().join("nb.ipynb"), Duration::from_secs(1800))
                .await
                .unwrap_err();

            match err {
                NotebookError::Timeout(limit) => assert_eq!(limit, Duration::from_millis(200)),
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
