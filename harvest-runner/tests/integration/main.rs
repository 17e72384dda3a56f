// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for harvest-runner: assembling and aggregating mock plugin results.

mod fixtures;
mod golden;
mod scenarios;
