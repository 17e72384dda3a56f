// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Serializable data model for [harvest](https://crates.io/crates/harvest-cli) result trees.
//!
//! A harvest run reduces the files written by each test plugin into a tree of
//! [`ResultNode`]s. The tree is serialized as JSON: every node is a record with a `name`,
//! an optional `status`, a list of `children`, and a map of `details`.
//!
//! This crate also documents the exit codes produced by the `harvest` binary, in
//! [`HarvestExitCode`].

mod exit_codes;
#[cfg(feature = "proptest1")]
pub mod proptest_helpers;
mod result_node;

pub use exit_codes::*;
pub use result_node::*;
