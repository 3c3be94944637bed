// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`TestRunner`], which runs elm-test and feeds its output
//! into a [`RunAccumulator`].

mod accumulator;
mod imp;
mod stats;

pub use accumulator::*;
pub use imp::*;
pub use stats::*;
