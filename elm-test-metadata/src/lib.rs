// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the machine-readable output of `elm-test --report json`.
//!
//! elm-test prints one JSON object per line once compilation succeeds. Lines that are not
//! recognized events (for example `Debug.log` output from inside a test) are passed through as
//! plain diagnostic text. The entry point is [`parse_line`].

mod events;
mod exit_codes;

pub use events::*;
pub use exit_codes::*;
