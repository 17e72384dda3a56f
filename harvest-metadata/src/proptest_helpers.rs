// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-based test strategies for result trees, enabled with the `proptest1` feature.

use crate::{ResultNode, Status};
use proptest::{collection::vec, option, prelude::*};

/// Generates a status, including a few strings outside of harvest's vocabulary.
pub fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        3 => Just(Status::Passed),
        1 => Just(Status::Failed),
        1 => Just(Status::Unknown),
        1 => Just(Status::Timeout),
        1 => "[a-z]{1,8}".prop_map(Status::from),
    ]
}

/// Generates an unaggregated tree of at most `depth` levels below the root.
///
/// Leaves may have an unset status, and branches have arbitrary (soon to be overwritten)
/// statuses.
pub fn arb_tree(depth: u32) -> impl Strategy<Value = ResultNode> {
    let leaf = ("[a-z0-9.]{1,6}", option::of(arb_status())).prop_map(|(name, status)| {
        ResultNode {
            name,
            status,
            ..Default::default()
        }
    });
    leaf.prop_recursive(depth, 64, 4, |inner| {
        (
            "[a-z0-9.]{1,6}",
            option::of(arb_status()),
            vec(inner, 1..4),
        )
            .prop_map(|(name, status, children)| ResultNode {
                name,
                status,
                children,
                ..Default::default()
            })
    })
}

/// Generates a sibling group of unaggregated trees.
pub fn arb_group() -> impl Strategy<Value = Vec<ResultNode>> {
    vec(arb_tree(3), 0..5)
}
