// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::Serialize;

/// An event sent to a test explorer.
///
/// Events are produced by [`emit_tree_events`](super::emit_tree_events) and
/// [`emit_source_locations`](super::emit_source_locations), and consumed by an [`EventSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExplorerEvent {
    /// A suite started.
    SuiteStarted {
        /// The suite ID.
        id: String,
    },

    /// A suite finished: every test in it has reported a result.
    SuiteFinished {
        /// The suite ID.
        id: String,
    },

    /// A test started.
    TestStarted {
        /// The test ID.
        id: String,
    },

    /// A test passed.
    TestPassed {
        /// The test ID.
        id: String,

        /// Output logged by the test.
        message: String,
    },

    /// A test failed, or has no result.
    TestFailed {
        /// The test ID.
        id: String,

        /// The failure message, including output logged by the test.
        message: String,
    },

    /// A test was skipped (`Test.todo`).
    TestSkipped {
        /// The test ID.
        id: String,

        /// The todo message, including output logged by the test.
        message: String,
    },

    /// The source location of a test was found.
    TestLocated {
        /// The test ID.
        id: String,

        /// The file the test is defined in.
        file: Utf8PathBuf,

        /// The zero-based line the test is defined on.
        line: usize,
    },
}

impl ExplorerEvent {
    /// Returns the ID of the suite or test this event is about.
    pub fn id(&self) -> &str {
        match self {
            Self::SuiteStarted { id }
            | Self::SuiteFinished { id }
            | Self::TestStarted { id }
            | Self::TestPassed { id, .. }
            | Self::TestFailed { id, .. }
            | Self::TestSkipped { id, .. }
            | Self::TestLocated { id, .. } => id,
        }
    }
}

/// A consumer of [`ExplorerEvent`]s.
///
/// Events are emitted synchronously, in traversal order.
pub trait EventSink {
    /// Handles an event.
    fn emit(&mut self, event: ExplorerEvent);
}

impl EventSink for Vec<ExplorerEvent> {
    fn emit(&mut self, event: ExplorerEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: ExplorerEvent) {
        (**self).emit(event);
    }
}
