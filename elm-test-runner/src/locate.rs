// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexes tests by source file, and finds where in a source file a test is defined.
//!
//! Locating tests is a textual heuristic rather than a parse: each label is looked for as a
//! double-quoted string literal, in order, after the previous label's match.

use crate::tree::{SuiteNode, SuiteTree, TestLeaf};
use camino::Utf8PathBuf;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Groups every test below `suite` by its source file.
///
/// Tests without a source file are skipped. Within a file, tests are in depth-first order.
pub fn group_tests_by_file(suite: &SuiteNode) -> BTreeMap<Utf8PathBuf, Vec<&TestLeaf>> {
    let mut by_file: BTreeMap<Utf8PathBuf, Vec<&TestLeaf>> = BTreeMap::new();
    for leaf in suite.leaves() {
        if let Some(file) = &leaf.file {
            by_file.entry(file.clone()).or_default().push(leaf);
        }
    }
    by_file
}

/// Finds the byte offset at which the test with the given label path is defined.
///
/// `labels` excludes the module name: the module is identified by the file. Each label must
/// appear as a quoted string after the previous one. The offset of the opening quote of the last
/// label is returned, or `None` if any label can't be found (or `labels` is empty).
pub fn find_offset_for_test(labels: &[impl AsRef<str>], source: &str) -> Option<usize> {
    let mut search_from = 0;
    let mut offset = None;
    for label in labels {
        let needle = format!("\"{}\"", label.as_ref());
        let found = search_from + source.get(search_from..)?.find(&needle)?;
        offset = Some(found);
        search_from = found + needle.len();
    }
    offset
}

/// Converts a byte offset into a zero-based line number.
pub fn offset_to_line(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

/// The files and tests touched by a set of requested IDs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilesAndTestIds {
    /// The source files that define the requested tests.
    pub files: BTreeSet<Utf8PathBuf>,

    /// The IDs of every requested test, with suites expanded to the tests below them.
    pub test_ids: BTreeSet<String>,
}

/// Expands the requested suite and test IDs to test IDs, and collects their source files.
///
/// IDs that aren't in the tree are skipped.
pub fn collect_files_and_test_ids(
    ids: impl IntoIterator<Item = impl AsRef<str>>,
    tree: &SuiteTree,
) -> FilesAndTestIds {
    let mut collected = FilesAndTestIds::default();
    for id in ids {
        let id = id.as_ref();
        let Some(node) = tree.find(id) else {
            debug!("requested ID `{id}` not found in the loaded tree, skipping");
            continue;
        };
        for leaf in node.leaves() {
            if let Some(file) = &leaf.file {
                collected.files.insert(file.clone());
            }
            collected.test_ids.insert(leaf.id.clone());
        }
    }
    collected
}
