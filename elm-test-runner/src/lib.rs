// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for elm-test-explorer.
//!
//! elm-test reports results as a stream of JSON lines. This crate runs elm-test, builds a tree of
//! suites and tests from that stream as it arrives, renders failure messages, and finds where each
//! test is defined in its source file. Results are handed to a test explorer as
//! [`ExplorerEvent`](reporter::ExplorerEvent)s.
//!
//! The main type here is [`TestRunner`](runner::TestRunner).

pub mod config;
pub mod errors;
pub mod locate;
pub mod message;
pub mod reporter;
pub mod runner;
pub mod test_command;
pub mod tree;
