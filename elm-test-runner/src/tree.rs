// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The suite tree: a hierarchy of suites and tests, built from label paths.
//!
//! Every node has an ID formed by joining the labels from the root down to the node with `/`,
//! starting with [`ROOT_ID`]. For example, the test `adds` in the `describe` block `math` of the
//! module `Calc` has the ID `root/Calc/math/adds`.
//!
//! Labels aren't escaped, so a label containing `/` makes IDs ambiguous. Such labels are accepted
//! with a warning.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

/// The ID of the root of every suite tree.
pub const ROOT_ID: &str = "root";

/// The separator between labels in a node ID.
pub const ID_SEPARATOR: char = '/';

/// Returns the ID of a child of `parent_id` with the given label.
pub fn child_id(parent_id: &str, label: &str) -> String {
    let mut id = String::with_capacity(parent_id.len() + 1 + label.len());
    id.push_str(parent_id);
    id.push(ID_SEPARATOR);
    id.push_str(label);
    id
}

/// Returns the ID of the node at the end of `labels`.
pub fn id_for_labels(labels: &[impl AsRef<str>]) -> String {
    labels
        .iter()
        .fold(ROOT_ID.to_owned(), |id, label| child_id(&id, label.as_ref()))
}

/// A suite tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuiteTree {
    root: SuiteNode,
}

impl SuiteTree {
    /// Creates a new, empty tree.
    pub fn new() -> Self {
        Self {
            root: SuiteNode::new(ROOT_ID.to_owned(), ROOT_ID, None),
        }
    }

    /// Returns the root suite.
    pub fn root(&self) -> &SuiteNode {
        &self.root
    }

    /// Returns true if the tree has no nodes other than the root.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Returns the number of tests in the tree.
    pub fn test_count(&self) -> usize {
        self.root.leaves().len()
    }

    /// Returns every test in the tree, in depth-first order.
    pub fn leaves(&self) -> Vec<&TestLeaf> {
        self.root.leaves()
    }

    /// Looks up a node by ID.
    pub fn find(&self, id: &str) -> Option<NodeRef<'_>> {
        self.root.find(id)
    }

    /// Inserts the test at the end of `labels`, creating suites along the way.
    ///
    /// Existing suites and tests are reused when their label matches. Every node created is
    /// associated with `file`. Returns the test, or `None` if `labels` is empty.
    pub fn insert(
        &mut self,
        labels: &[String],
        file: Option<&Utf8Path>,
    ) -> Option<&mut TestLeaf> {
        let (leaf_label, suite_labels) = labels.split_last()?;
        if let Some(label) = labels.iter().find(|label| label.contains(ID_SEPARATOR)) {
            warn!(
                "label `{label}` contains `{ID_SEPARATOR}`: \
                 test IDs under it are ambiguous"
            );
        }

        let mut current = &mut self.root;
        for label in suite_labels {
            let position = current
                .children
                .iter()
                .position(|child| matches!(child, TestNode::Suite(suite) if suite.label == *label));
            let index = match position {
                Some(index) => index,
                None => {
                    let id = child_id(&current.id, label);
                    warn_if_shadowed(current, label, &id);
                    current
                        .children
                        .push(TestNode::Suite(SuiteNode::new(id, label, file)));
                    current.children.len() - 1
                }
            };
            let TestNode::Suite(next) = &mut current.children[index] else {
                unreachable!("index always points to a suite");
            };
            current = next;
        }

        let position = current
            .children
            .iter()
            .position(|child| matches!(child, TestNode::Test(test) if test.label == *leaf_label));
        let index = match position {
            Some(index) => index,
            None => {
                let id = child_id(&current.id, leaf_label);
                warn_if_shadowed(current, leaf_label, &id);
                current
                    .children
                    .push(TestNode::Test(TestLeaf::new(id, leaf_label, file)));
                current.children.len() - 1
            }
        };
        let TestNode::Test(leaf) = &mut current.children[index] else {
            unreachable!("index always points to a test");
        };
        Some(leaf)
    }
}

/// A suite and a test with the same label under the same parent share an ID, and lookups by that
/// ID only find one of them.
fn warn_if_shadowed(parent: &SuiteNode, label: &str, id: &str) {
    if parent.children.iter().any(|child| match child {
        TestNode::Suite(suite) => suite.label == label,
        TestNode::Test(test) => test.label == label,
    }) {
        warn!("a suite and a test are both labeled `{label}`: the ID `{id}` is ambiguous");
    }
}

impl Default for SuiteTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A node in a [`SuiteTree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestNode {
    /// A module or `describe` block.
    Suite(SuiteNode),

    /// A single test.
    Test(TestLeaf),
}

impl TestNode {
    /// Returns a reference to this node.
    pub fn as_node_ref(&self) -> NodeRef<'_> {
        match self {
            Self::Suite(suite) => NodeRef::Suite(suite),
            Self::Test(test) => NodeRef::Test(test),
        }
    }

    /// Returns the ID of this node.
    pub fn id(&self) -> &str {
        self.as_node_ref().id()
    }
}

/// A borrowed node in a [`SuiteTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRef<'a> {
    /// A suite.
    Suite(&'a SuiteNode),

    /// A test.
    Test(&'a TestLeaf),
}

impl<'a> NodeRef<'a> {
    /// Returns the ID of this node.
    pub fn id(self) -> &'a str {
        match self {
            Self::Suite(suite) => &suite.id,
            Self::Test(test) => &test.id,
        }
    }

    /// Returns every test at or below this node, in depth-first order.
    pub fn leaves(self) -> Vec<&'a TestLeaf> {
        match self {
            Self::Suite(suite) => suite.leaves(),
            Self::Test(test) => vec![test],
        }
    }
}

/// A module or `describe` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuiteNode {
    /// The ID of this suite.
    pub id: String,

    /// The label of this suite.
    pub label: String,

    /// A short description shown next to the label.
    pub description: Option<String>,

    /// The suites and tests in this suite, in the order they were first reported.
    pub children: Vec<TestNode>,

    /// The source file this suite is defined in, if known.
    pub file: Option<Utf8PathBuf>,
}

impl SuiteNode {
    fn new(id: String, label: &str, file: Option<&Utf8Path>) -> Self {
        Self {
            id,
            label: label.to_owned(),
            description: None,
            children: Vec::new(),
            file: file.map(ToOwned::to_owned),
        }
    }

    /// Returns every test below this suite, in depth-first order.
    pub fn leaves(&self) -> Vec<&TestLeaf> {
        let mut leaves = Vec::new();
        let mut stack: Vec<&TestNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            match node {
                TestNode::Suite(suite) => stack.extend(suite.children.iter().rev()),
                TestNode::Test(test) => leaves.push(test),
            }
        }
        leaves
    }

    /// Looks up a node at or below this suite by ID.
    pub fn find(&self, id: &str) -> Option<NodeRef<'_>> {
        if self.id == id {
            return Some(NodeRef::Suite(self));
        }
        let mut stack: Vec<&TestNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id() == id {
                return Some(node.as_node_ref());
            }
            if let TestNode::Suite(suite) = node {
                stack.extend(suite.children.iter());
            }
        }
        None
    }
}

/// A single test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestLeaf {
    /// The ID of this test.
    pub id: String,

    /// The label of this test.
    pub label: String,

    /// A short description shown next to the label.
    pub description: Option<String>,

    /// The source file this test is defined in, if known.
    pub file: Option<Utf8PathBuf>,

    /// Whether this test was skipped (`Test.todo`), if known.
    pub skipped: Option<bool>,
}

impl TestLeaf {
    fn new(id: String, label: &str, file: Option<&Utf8Path>) -> Self {
        Self {
            id,
            label: label.to_owned(),
            description: None,
            file: file.map(ToOwned::to_owned),
            skipped: None,
        }
    }
}
