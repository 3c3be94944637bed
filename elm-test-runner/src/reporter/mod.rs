// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the results of a test run to a test explorer.
//!
//! Results are reported as [`ExplorerEvent`]s, sent to an [`EventSink`].

mod events;
mod replay;

pub use events::*;
pub use replay::*;
