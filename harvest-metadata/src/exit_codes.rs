// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `harvest` failures.
///
/// `harvest` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum HarvestExitCode {}

impl HarvestExitCode {
    /// The results were collected and every plugin passed.
    pub const OK: i32 = 0;

    /// The results were collected, but the overall status resolved to unknown.
    ///
    /// This typically means that no results were found, or that some results were skipped.
    pub const RUN_UNKNOWN: i32 = 4;

    /// The results were collected, and at least one result failed or timed out.
    pub const RUN_FAILED: i32 = 100;

    /// Errors occurred while collecting results, and `--fail-on-collection-errors` was passed.
    ///
    /// The result tree is still produced in this case.
    pub const COLLECTION_ERRORS: i32 = 104;

    /// A user issue happened while setting up a harvest invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout, stderr or an output file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
