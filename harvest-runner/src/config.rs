// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for harvest.
//!
//! The config is a TOML file with two sections:
//!
//! ```toml
//! [collect]
//! threads = "num-cpus"
//! read-timeout = "30s"
//!
//! [plugins.e2e]
//! driver = "job"
//! result-format = "junit"
//! result-files = ["output.xml"]
//! ```
//!
//! Values not set in the user's file come from the default config embedded in harvest.

mod imp;
#[cfg(test)]
mod test_helpers;
mod threads;

pub use imp::*;
pub use threads::*;
