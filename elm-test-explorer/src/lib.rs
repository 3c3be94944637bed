// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs [elm-test](https://github.com/elm-explorations/test) and reports results as test explorer
//! events.
//!
//! The core logic lives in `elm-test-runner`. This crate is the command-line front-end: it parses
//! arguments, sets up logging, and writes events to stdout.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod reporter;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
#[doc(hidden)]
pub use reporter::MessageFormat;
