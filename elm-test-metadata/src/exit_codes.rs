// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `elm-test` and `elm-test-explorer`.
///
/// The first group is produced by `elm-test` itself and is interpreted by the runner. The second
/// group is produced by the `elm-test-explorer` binary for failures of its own.
pub enum ElmTestExitCode {}

impl ElmTestExitCode {
    /// No errors occurred and every test passed.
    pub const OK: i32 = 0;

    /// Compiling the tests failed.
    ///
    /// This is the only exit code of the initial compile check that fails a run.
    pub const BUILD_FAILED: i32 = 1;

    /// One or more tests failed (or were left as `Test.todo`).
    pub const TESTS_FAILED: i32 = 2;

    /// A user issue happened while setting up an `elm-test-explorer` invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
