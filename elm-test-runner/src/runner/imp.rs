// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ResultIndex, RunAccumulator, RunKind};
use crate::{
    config::ExplorerConfig,
    errors::{RunError, RunPhase},
    locate::collect_files_and_test_ids,
    test_command::{ArgsBuilder, DefaultArgsBuilder, ElmBinaries, OutputLine, run_streaming},
    tree::SuiteTree,
};
use camino::{Utf8Path, Utf8PathBuf};
use elm_test_metadata::ElmTestExitCode;
use tracing::{debug, info, warn};

/// Test runner options.
#[derive(Debug, Default)]
pub struct TestRunnerBuilder {
    binaries: Option<ElmBinaries>,
    args_builder: Option<Box<dyn ArgsBuilder>>,
}

impl TestRunnerBuilder {
    /// Sets the binaries to run, instead of locating them from the config.
    pub fn set_binaries(&mut self, binaries: ElmBinaries) -> &mut Self {
        self.binaries = Some(binaries);
        self
    }

    /// Sets the builder for elm-test command lines.
    ///
    /// Defaults to [`DefaultArgsBuilder`].
    pub fn set_args_builder(&mut self, args_builder: impl ArgsBuilder + 'static) -> &mut Self {
        self.args_builder = Some(Box::new(args_builder));
        self
    }

    /// Creates a new test runner for the workspace described by `config`.
    pub fn build(self, config: ExplorerConfig) -> TestRunner {
        let binaries = self
            .binaries
            .unwrap_or_else(|| ElmBinaries::locate(&config));
        let args_builder = self
            .args_builder
            .unwrap_or_else(|| Box::new(DefaultArgsBuilder));
        TestRunner {
            binaries,
            args_builder,
            accumulator: RunAccumulator::new(config),
        }
    }
}

/// Runs elm-test for a single workspace, and keeps the results.
///
/// Runs take `&mut self`, so at most one run is in flight at a time.
#[derive(Debug)]
pub struct TestRunner {
    binaries: ElmBinaries,
    args_builder: Box<dyn ArgsBuilder>,
    accumulator: RunAccumulator,
}

impl TestRunner {
    /// Returns the config.
    pub fn config(&self) -> &ExplorerConfig {
        self.accumulator.config()
    }

    /// Returns the loaded tree, if a run has finished.
    pub fn loaded_tree(&self) -> Option<&SuiteTree> {
        self.accumulator.loaded()
    }

    /// Returns the results of every test seen since the last run of all tests.
    pub fn results(&self) -> &ResultIndex {
        self.accumulator.results()
    }

    /// Runs every test in the workspace.
    ///
    /// Returns the loaded tree.
    pub async fn run_all(&mut self) -> Result<&SuiteTree, RunError> {
        self.run(RunKind::All).await
    }

    /// Runs the tests in the given files.
    ///
    /// Results for tests in other files are kept. Returns the loaded tree.
    pub async fn run_some(&mut self, files: Vec<Utf8PathBuf>) -> Result<&SuiteTree, RunError> {
        self.run(RunKind::Some(files)).await
    }

    /// Runs the tests and suites with the given IDs.
    ///
    /// If no tree is loaded yet, every test is run first so that IDs can be resolved. Otherwise,
    /// the files that define the requested tests are run. Returns the IDs of the requested tests,
    /// with suites expanded to the tests below them.
    pub async fn run_selected(
        &mut self,
        ids: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Vec<String>, RunError> {
        let ids: Vec<String> = ids.into_iter().map(|id| id.as_ref().to_owned()).collect();

        let selected = match self.accumulator.loaded() {
            None => {
                debug!("no tree loaded: running all tests to resolve IDs");
                let tree = self.run_all().await?;
                collect_files_and_test_ids(&ids, tree)
            }
            Some(tree) => {
                let selected = collect_files_and_test_ids(&ids, tree);
                if selected.files.is_empty() {
                    warn!("none of the requested tests are defined in a known file");
                } else {
                    self.run_some(selected.files.iter().cloned().collect())
                        .await?;
                }
                selected
            }
        };

        Ok(selected.test_ids.into_iter().collect())
    }

    async fn run(&mut self, kind: RunKind) -> Result<&SuiteTree, RunError> {
        let cwd = self.config().workspace_root().to_owned();

        let build_argv = self.args_builder.build_args(&self.binaries, kind.files());
        let stderr = build(&build_argv, &cwd).await?;
        if let Some(stderr) = stderr {
            return Err(RunError::BuildFailed {
                command: build_argv,
                stderr,
            });
        }

        let report_argv = self.args_builder.report_args(&self.binaries, kind.files());
        self.accumulator.start(kind);
        let accumulator = &mut self.accumulator;
        let status = run_streaming(RunPhase::Report, &report_argv, &cwd, |line| match line {
            OutputLine::Stdout(line) => accumulator.accept_line(&line),
            OutputLine::Stderr(line) => debug!("elm-test stderr: {line}"),
        })
        .await?;

        match status.code() {
            Some(ElmTestExitCode::OK) => debug!("all tests passed"),
            Some(ElmTestExitCode::TESTS_FAILED) => debug!("some tests failed"),
            Some(code) => warn!("elm-test exited with code {code}"),
            None => warn!("elm-test was terminated ({status}): results may be incomplete"),
        }

        let tree = self.accumulator.finish();
        info!("loaded {} tests", tree.test_count());
        Ok(tree)
    }
}

/// Runs the compile check.
///
/// Returns the captured standard error if compilation failed.
async fn build(argv: &[String], cwd: &Utf8Path) -> Result<Option<String>, RunError> {
    let mut stderr = String::new();
    let status = run_streaming(RunPhase::Build, argv, cwd, |line| match line {
        OutputLine::Stdout(line) => debug!("elm-test make: {line}"),
        OutputLine::Stderr(line) => {
            debug!("elm-test make stderr: {line}");
            stderr.push_str(&line);
            stderr.push('\n');
        }
    })
    .await?;

    match status.code() {
        Some(ElmTestExitCode::BUILD_FAILED) => Ok(Some(stderr)),
        Some(ElmTestExitCode::OK) => Ok(None),
        _ => {
            warn!("compile check exited with {status}: running tests anyway");
            Ok(None)
        }
    }
}
