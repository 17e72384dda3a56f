// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolls leaf statuses up through a result tree.
//!
//! Aggregation is a post-order walk. Every leaf with an unset status is set to `unknown`, and
//! every branch's status is overwritten with the combined status of its children. The
//! combined status of a group is decided by the highest-priority [`StatusClass`] present in it.
//!
//! Every node of a group is visited even after a failure has been seen, so that each node in
//! the final tree carries its own resolved status.

use harvest_metadata::{ResultNode, Status};

/// The priority class of a status, used to combine the statuses of a sibling group.
///
/// Classes are ordered by priority: `Passed < Unknown < Failed`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StatusClass {
    /// `passed`, and every status outside of harvest's vocabulary.
    Passed,

    /// `unknown`.
    Unknown,

    /// `failed` and `timeout`.
    Failed,
}

impl StatusClass {
    /// Returns the class of a status.
    pub fn of(status: &Status) -> Self {
        match status {
            Status::Failed | Status::Timeout => Self::Failed,
            Status::Unknown => Self::Unknown,
            Status::Passed | Status::Other(_) => Self::Passed,
        }
    }

    /// Returns the status reported for a group whose highest class is `self`.
    pub fn to_status(self) -> Status {
        match self {
            Self::Passed => Status::Passed,
            Self::Unknown => Status::Unknown,
            Self::Failed => Status::Failed,
        }
    }
}

/// Aggregates the statuses of a sibling group in place, returning the group's combined status.
///
/// An empty group is `unknown`: nothing having run is never reported as success.
pub fn aggregate(nodes: &mut [ResultNode]) -> Status {
    if nodes.is_empty() {
        return Status::Unknown;
    }

    let mut combined = StatusClass::Passed;
    for node in nodes.iter_mut() {
        let status = if node.is_leaf() {
            if is_unset(node.status.as_ref()) {
                node.status.insert(Status::Unknown)
            } else {
                node.status.get_or_insert(Status::Unknown)
            }
        } else {
            let children_status = aggregate(&mut node.children);
            node.status.insert(children_status)
        };
        combined = combined.max(StatusClass::of(status));
    }

    combined.to_status()
}

/// Aggregates a single tree in place, returning the root's resolved status.
pub fn aggregate_tree(root: &mut ResultNode) -> Status {
    aggregate(std::slice::from_mut(root))
}

fn is_unset(status: Option<&Status>) -> bool {
    match status {
        None => true,
        Some(Status::Other(s)) => s.is_empty(),
        Some(_) => false,
    }
}
