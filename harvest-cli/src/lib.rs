// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collects the results written by conformance plugins and rolls them up into one status.
//!
//! The `harvest` binary has two subcommands:
//!
//! * `harvest collect` reads a plugin's results and errors from a results root, builds a
//!   status-resolved tree, and prints it as an indented tree or as JSON.
//! * `harvest rollup` re-aggregates a previously written JSON tree and prints its status.
//!
//! The exit code reflects the overall status; see
//! [`HarvestExitCode`](harvest_metadata::HarvestExitCode).

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod render;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
