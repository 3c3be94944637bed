// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Projects a suite tree and its results into [`ExplorerEvent`]s.
//!
//! After a partial run, replaying the full loaded tree keeps the state of tests that weren't
//! re-run: every test is reported from the result index as if it had just completed.

use super::{EventSink, ExplorerEvent};
use crate::{
    locate::{find_offset_for_test, group_tests_by_file, offset_to_line},
    message::build_message,
    runner::ResultIndex,
    tree::{SuiteNode, SuiteTree, TestNode},
};
use elm_test_metadata::TestStatus;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

/// Emits events for `suite` and everything below it, in depth-first order.
///
/// Each suite is bracketed by [`ExplorerEvent::SuiteStarted`] and
/// [`ExplorerEvent::SuiteFinished`]. Each test produces [`ExplorerEvent::TestStarted`] followed by
/// exactly one of `TestPassed`, `TestSkipped` or `TestFailed`. A test with no result is reported
/// as failed.
pub fn emit_tree_events(suite: &SuiteNode, results: &ResultIndex, sink: &mut dyn EventSink) {
    sink.emit(ExplorerEvent::SuiteStarted {
        id: suite.id.clone(),
    });
    for child in &suite.children {
        match child {
            TestNode::Suite(child) => emit_tree_events(child, results, sink),
            TestNode::Test(test) => emit_test_result(&test.id, results, sink),
        }
    }
    sink.emit(ExplorerEvent::SuiteFinished {
        id: suite.id.clone(),
    });
}

/// Emits started and terminal events for each of the given test IDs, in order.
pub fn emit_test_events(
    ids: impl IntoIterator<Item = impl AsRef<str>>,
    results: &ResultIndex,
    sink: &mut dyn EventSink,
) {
    for id in ids {
        emit_test_result(id.as_ref(), results, sink);
    }
}

fn emit_test_result(id: &str, results: &ResultIndex, sink: &mut dyn EventSink) {
    sink.emit(ExplorerEvent::TestStarted { id: id.to_owned() });

    let id = id.to_owned();
    let event = match results.get(&id) {
        Some(result) => {
            let message = build_message(result);
            match result.status {
                TestStatus::Pass => ExplorerEvent::TestPassed { id, message },
                TestStatus::Todo => ExplorerEvent::TestSkipped { id, message },
                TestStatus::Fail => ExplorerEvent::TestFailed { id, message },
            }
        }
        None => ExplorerEvent::TestFailed {
            id,
            message: String::new(),
        },
    };
    sink.emit(event);
}

/// Emits a [`ExplorerEvent::TestLocated`] event for every test whose definition can be found in
/// its source file.
///
/// Each file is read once. Files are read concurrently and handled in the order reads complete,
/// so events for different files are in no particular order. Tests that can't be located, and
/// files that can't be read, are skipped.
///
/// Returns the number of events emitted.
pub async fn emit_source_locations(
    tree: &SuiteTree,
    results: &ResultIndex,
    sink: &mut dyn EventSink,
) -> usize {
    let mut reads: FuturesUnordered<_> = group_tests_by_file(tree.root())
        .into_iter()
        .map(|(file, tests)| async move {
            let source = tokio::fs::read_to_string(&file).await;
            (file, tests, source)
        })
        .collect();

    let mut emitted = 0;
    while let Some((file, tests, source)) = reads.next().await {
        let source = match source {
            Ok(source) => source,
            Err(error) => {
                warn!("could not read {file} to locate tests: {error}");
                continue;
            }
        };

        for test in tests {
            let Some(result) = results.get(&test.id) else {
                continue;
            };
            // The module is identified by the file, so skip it.
            let labels = result.labels.get(1..).unwrap_or_default();
            let Some(offset) = find_offset_for_test(labels, &source) else {
                debug!("could not locate {} in {file}", test.id);
                continue;
            };
            sink.emit(ExplorerEvent::TestLocated {
                id: test.id.clone(),
                file: file.clone(),
                line: offset_to_line(&source, offset),
            });
            emitted += 1;
        }
    }

    emitted
}
