// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [harvest](https://crates.io/crates/harvest-cli): collecting the
//! result files written by test plugins and rolling them up into one status tree.
//!
//! The basic flow is:
//!
//! 1. Load a [`HarvestConfig`](config::HarvestConfig) and look up a
//!    [`PluginDescriptor`](plugin::PluginDescriptor).
//! 2. Build an [`Assembler`](assemble::Assembler), and call
//!    [`collect_plugin`](assemble::collect_plugin) with the results directory.
//! 3. The returned [`PluginResults`](assemble::PluginResults) hold the status-resolved tree,
//!    the overall status and any errors encountered while collecting.

pub mod aggregate;
pub mod assemble;
pub mod config;
pub mod decode;
pub mod errors;
pub mod plugin;
pub mod select;
