// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// These tests drive real child processes through `sh`.
#![cfg(unix)]

mod basic;
mod fixtures;
