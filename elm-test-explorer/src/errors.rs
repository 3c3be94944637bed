// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use elm_test_metadata::ElmTestExitCode;
use elm_test_runner::errors::{ConfigParseError, RunError};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholder messages: the expected way to print out errors is with
// the display_to_stderr method, which colorizes errors.

/// An error that is expected to happen in normal operation, and is reported without a backtrace.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("workspace root is invalid")]
    WorkspaceRootInvalid { workspace_root: Utf8PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to create Tokio runtime")]
    RuntimeCreateError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to read saved report")]
    ReportReadError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("elm-test run failed")]
    RunError {
        #[from]
        err: RunError,
    },
    #[error("failed to write events")]
    WriteEventError {
        #[source]
        err: std::io::Error,
    },
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    pub(crate) fn current_dir_failed(err: std::io::Error) -> Self {
        Self::CurrentDirFailed { err }
    }

    pub(crate) fn workspace_root_invalid(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        Self::WorkspaceRootInvalid {
            workspace_root: workspace_root.into(),
        }
    }

    pub(crate) fn runtime_create_error(err: std::io::Error) -> Self {
        Self::RuntimeCreateError { err }
    }

    pub(crate) fn report_read_error(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::ReportReadError {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn write_event_error(err: std::io::Error) -> Self {
        Self::WriteEventError { err }
    }

    pub(crate) fn test_run_failed() -> Self {
        Self::TestRunFailed
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::WorkspaceRootInvalid { .. }
            | Self::ConfigParseError { .. }
            | Self::RuntimeCreateError { .. }
            | Self::ReportReadError { .. } => ElmTestExitCode::SETUP_ERROR,
            Self::RunError { err } => {
                if err.is_build_failure() {
                    ElmTestExitCode::BUILD_FAILED
                } else {
                    ElmTestExitCode::SETUP_ERROR
                }
            }
            Self::WriteEventError { .. } => ElmTestExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed => ElmTestExitCode::TESTS_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::WorkspaceRootInvalid { workspace_root } => {
                error!(
                    "workspace root `{}` is not a directory",
                    workspace_root.style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::RuntimeCreateError { err } => {
                error!("failed to create Tokio runtime");
                Some(err as &dyn Error)
            }
            Self::ReportReadError { path, err } => {
                error!("failed to read saved report from `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::RunError { err } => {
                error!("{err}");
                // A build failure's message already points at the elm-test output.
                if err.is_build_failure() {
                    None
                } else {
                    err.source()
                }
            }
            Self::WriteEventError { err } => {
                error!("failed to write events");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
