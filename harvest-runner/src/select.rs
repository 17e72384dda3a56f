// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selects which files in a target directory are authoritative results.

/// Selects the result files among the files present in a target directory.
///
/// * If `declared` is non-empty, returns the present files named in `declared`, in declared
///   order. Files that are present but not declared are ignored: plugins may write scratch files
///   next to their results. Files that are declared but not present are skipped.
/// * If `declared` is empty, returns every present file in the order given.
///
/// `present` is expected to be in directory-listing order.
pub fn select(declared: &[String], present: &[String]) -> Vec<String> {
    if declared.is_empty() {
        return present.to_vec();
    }

    let mut selected: Vec<String> = Vec::with_capacity(declared.len());
    for name in declared {
        if present.contains(name) && !selected.contains(name) {
            selected.push(name.clone());
        }
    }
    selected
}
