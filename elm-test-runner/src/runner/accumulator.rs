// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{config::ExplorerConfig, tree::SuiteTree};
use camino::Utf8PathBuf;
use elm_test_metadata::{ParsedLine, TestEvent, TestResult, TestStatus, parse_line};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Results of completed tests, keyed by test ID.
pub type ResultIndex = BTreeMap<String, TestResult>;

/// Determines when the tree built by a run replaces the loaded tree.
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PromotionPolicy {
    /// A tree is promoted only if no tree has been loaded yet.
    ///
    /// The first run fixes the shape of the loaded tree. Later runs only update results.
    #[default]
    FirstLoad,

    /// Every run of all tests replaces the loaded tree.
    ///
    /// Partial runs are promoted only if no tree has been loaded yet.
    FullRuns,
}

/// The tests selected by a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunKind {
    /// Every test in the workspace.
    All,

    /// Only the tests in these files.
    Some(Vec<Utf8PathBuf>),
}

impl RunKind {
    /// Returns the files selected, or `None` for all tests.
    pub fn files(&self) -> Option<&[Utf8PathBuf]> {
        match self {
            Self::All => None,
            Self::Some(files) => Some(files),
        }
    }
}

/// Accumulates parsed elm-test output into a suite tree and a result index.
///
/// Lines must be fed in the order elm-test wrote them: output logged by a test precedes that
/// test's result, and is attached to it.
#[derive(Clone, Debug)]
pub struct RunAccumulator {
    config: ExplorerConfig,
    pending: Vec<String>,
    loading: SuiteTree,
    loaded: Option<SuiteTree>,
    results: ResultIndex,
    current: Option<RunKind>,
}

impl RunAccumulator {
    /// Creates a new accumulator with nothing loaded.
    ///
    /// `config` determines how test modules map to source files, and the [`PromotionPolicy`].
    pub fn new(config: ExplorerConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            loading: SuiteTree::new(),
            loaded: None,
            results: ResultIndex::new(),
            current: None,
        }
    }

    /// Returns the config.
    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Returns the tree currently being built.
    pub fn loading(&self) -> &SuiteTree {
        &self.loading
    }

    /// Returns the loaded tree, if a run has finished.
    pub fn loaded(&self) -> Option<&SuiteTree> {
        self.loaded.as_ref()
    }

    /// Returns the results of every test seen since the last run of all tests.
    pub fn results(&self) -> &ResultIndex {
        &self.results
    }

    /// Returns output that hasn't been attached to a test yet.
    pub fn pending_messages(&self) -> &[String] {
        &self.pending
    }

    /// Starts a new run.
    ///
    /// Pending output is discarded and a new tree is started. Results are cleared only for a run
    /// of all tests, so results from earlier runs stay available after a partial run.
    pub fn start(&mut self, kind: RunKind) {
        debug!("starting run: {kind:?}");
        self.pending.clear();
        self.loading = SuiteTree::new();
        if kind == RunKind::All {
            self.results.clear();
        }
        self.current = Some(kind);
    }

    /// Parses and accepts a single line of output.
    pub fn accept_line(&mut self, line: &str) {
        self.accept(parse_line(line));
    }

    /// Accepts a parsed line of output.
    pub fn accept(&mut self, line: ParsedLine) {
        match line {
            ParsedLine::Diagnostic(message) => self.pending.push(message),
            ParsedLine::Event(TestEvent::TestCompleted(result)) => self.accept_result(result),
            ParsedLine::Event(TestEvent::RunStart(start)) => {
                debug!(
                    "elm-test run started: {} tests, seed {}",
                    start.test_count.unwrap_or_default(),
                    start.initial_seed.as_deref().unwrap_or("unknown"),
                );
            }
            ParsedLine::Event(TestEvent::RunComplete(complete)) => {
                debug!(
                    "elm-test run complete: {} passed, {} failed",
                    complete.passed.unwrap_or_default(),
                    complete.failed.unwrap_or_default(),
                );
                if let Some(reason) = &complete.auto_fail {
                    debug!("elm-test failed the run: {reason}");
                }
            }
        }
    }

    fn accept_result(&mut self, mut result: TestResult) {
        result.messages = std::mem::take(&mut self.pending);
        let file = result
            .module_name()
            .map(|module| self.config.source_path_for_module(module));

        let Some(leaf) = self.loading.insert(&result.labels, file.as_deref()) else {
            debug!("ignoring result with no labels");
            return;
        };
        leaf.skipped = Some(result.status == TestStatus::Todo);
        if let Some(duration) = result.duration_ms {
            leaf.description = Some(format!("{duration} ms"));
        }
        let id = leaf.id.clone();
        self.results.insert(id, result);
    }

    /// Finishes the current run, promoting the tree it built according to the
    /// [`PromotionPolicy`].
    ///
    /// Returns the loaded tree.
    pub fn finish(&mut self) -> &SuiteTree {
        if !self.pending.is_empty() {
            debug!(
                "discarding {} lines of output not followed by a result",
                self.pending.len()
            );
            self.pending.clear();
        }

        let built = std::mem::take(&mut self.loading);
        let full_run = self.current.take() == Some(RunKind::All);
        let promote = match (&self.loaded, self.config.promotion()) {
            (None, _) => true,
            (Some(_), PromotionPolicy::FullRuns) => full_run,
            (Some(_), PromotionPolicy::FirstLoad) => false,
        };
        if promote {
            debug!("promoting tree with {} tests", built.test_count());
            self.loaded = Some(built);
        }
        self.loaded.get_or_insert_with(SuiteTree::new)
    }
}
