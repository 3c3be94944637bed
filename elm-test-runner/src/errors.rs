// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by elm-test-runner.

use camino::Utf8PathBuf;
use std::{fmt, sync::Arc};
use thiserror::Error;

/// An error that occurred while reading or parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse elm-test-explorer config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred in [`ConfigParseError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// The config file could not be read.
    #[error("error reading config file")]
    Read(#[source] std::io::Error),

    /// The config could not be built or deserialized.
    #[error("error building config")]
    Build(#[source] Box<config::ConfigError>),
}

/// The phase of a run in which an error occurred.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// The initial compile check.
    Build,

    /// The run that produces the JSON report.
    Report,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Build => write!(f, "compile check"),
            Self::Report => write!(f, "report run"),
        }
    }
}

/// An error that fails a test run.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The tests could not be compiled.
    ///
    /// elm-test only reports results once compilation succeeds, so no tree is produced.
    #[error(
        "elm-test failed.\n\
         The tests could not be compiled: `{}` exited with code 1.\n\
         Check the output of the elm-test task or terminal for details.",
        shell_words::join(.command)
    )]
    BuildFailed {
        /// The command that was run.
        command: Vec<String>,

        /// Standard error produced by the command.
        stderr: String,
    },

    /// Spawning elm-test failed.
    #[error("for the {phase}, spawning `{}` failed", shell_words::join(.command))]
    Spawn {
        /// The phase that failed.
        phase: RunPhase,

        /// The command that was run.
        command: Vec<String>,

        /// The underlying error.
        #[source]
        error: Arc<std::io::Error>,
    },

    /// Reading output from elm-test failed.
    #[error("for the {phase}, reading {stream} failed")]
    ReadOutput {
        /// The phase that failed.
        phase: RunPhase,

        /// The stream being read: `stdout` or `stderr`.
        stream: &'static str,

        /// The underlying error.
        #[source]
        error: Arc<std::io::Error>,
    },

    /// Waiting for elm-test to exit failed.
    #[error("for the {phase}, waiting for elm-test to exit failed")]
    Wait {
        /// The phase that failed.
        phase: RunPhase,

        /// The underlying error.
        #[source]
        error: Arc<std::io::Error>,
    },
}

impl RunError {
    pub(crate) fn spawn(
        phase: RunPhase,
        command: impl IntoIterator<Item = impl Into<String>>,
        error: std::io::Error,
    ) -> Self {
        Self::Spawn {
            phase,
            command: command.into_iter().map(Into::into).collect(),
            error: Arc::new(error),
        }
    }

    /// Returns true if this is a build failure.
    pub fn is_build_failure(&self) -> bool {
        matches!(self, Self::BuildFailed { .. })
    }
}
