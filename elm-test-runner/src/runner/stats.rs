// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ResultIndex;
use elm_test_metadata::{TestResult, TestStatus};

/// Statistics for a set of test results.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed.
    pub failed: usize,

    /// The number of `Test.todo` placeholders.
    pub todo: usize,
}

impl RunStats {
    /// Computes statistics over every result in the index.
    pub fn from_results(results: &ResultIndex) -> Self {
        Self::from_iter(results.values())
    }

    /// Computes statistics over the results for the given test IDs.
    ///
    /// IDs without a result count as failed.
    pub fn for_ids(ids: impl IntoIterator<Item = impl AsRef<str>>, results: &ResultIndex) -> Self {
        let mut stats = Self::default();
        for id in ids {
            match results.get(id.as_ref()) {
                Some(result) => stats.add(result),
                None => stats.failed += 1,
            }
        }
        stats
    }

    /// Returns the total number of tests.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.todo
    }

    /// Returns true if no tests failed.
    ///
    /// As with elm-test, a run with todo tests is not a success.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.todo == 0
    }

    fn add(&mut self, result: &TestResult) {
        match result.status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Todo => self.todo += 1,
            TestStatus::Fail => self.failed += 1,
        }
    }
}

impl<'a> FromIterator<&'a TestResult> for RunStats {
    fn from_iter<T: IntoIterator<Item = &'a TestResult>>(iter: T) -> Self {
        let mut stats = Self::default();
        for result in iter {
            stats.add(result);
        }
        stats
    }
}
