// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{borrow::Cow, collections::BTreeMap, convert::Infallible, fmt, str::FromStr};

/// The status of a [`ResultNode`].
///
/// The closed vocabulary understood by harvest is `passed`, `failed`, `unknown` and `timeout`.
/// Any other string is preserved verbatim as [`Status::Other`]: result producers outside of
/// harvest's control may emit their own vocabulary, and harvest never rewrites it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    /// The result passed.
    Passed,

    /// The result failed.
    Failed,

    /// The result could not be determined, or was skipped.
    Unknown,

    /// The result was not produced in time.
    Timeout,

    /// A status string outside of harvest's vocabulary.
    Other(String),
}

impl Status {
    /// Returns the string form of this status, as written to serialized trees.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
            Self::Timeout => "timeout",
            Self::Other(s) => s,
        }
    }

    /// Returns true if this status is one of the statuses harvest itself understands.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "unknown" => Self::Unknown,
            "timeout" => Self::Timeout,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match Status::from(s.as_str()) {
            Self::Other(_) => Self::Other(s),
            known => known,
        }
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Cow::<'de, str>::deserialize(deserializer)?;
        Ok(Status::from(s.into_owned()))
    }
}

/// One entry in a hierarchical result report.
///
/// A node with children is a *branch*: its status is derived from its children during
/// aggregation. A node without children is a *leaf*: its status, if set, is authoritative.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResultNode {
    /// The name of this node: a file name, a node name, a plugin name, or a name from a
    /// structured report.
    pub name: String,

    /// The status of this node. `None` represents an unset status.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_status"
    )]
    pub status: Option<Status>,

    /// Child nodes, in collection order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResultNode>,

    /// Opaque key/value data carried along with the node.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ResultNode {
    /// Creates a new node with the given name, no status, no children and no details.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a leaf with the given status.
    pub fn leaf(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            status: Some(status),
            ..Default::default()
        }
    }

    /// Creates a branch with the given children. The status is left unset until aggregation.
    pub fn branch(name: impl Into<String>, children: Vec<ResultNode>) -> Self {
        Self {
            name: name.into(),
            children,
            ..Default::default()
        }
    }

    /// Adds a detail to this node, replacing any existing value for the key.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns true if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the status of this node as a string, or `""` if unset.
    pub fn status_str(&self) -> &str {
        self.status.as_ref().map_or("", Status::as_str)
    }

    /// Counts the leaves under (and including) this node by status.
    pub fn leaf_counts(&self) -> LeafCounts {
        let mut counts = LeafCounts::default();
        self.add_leaf_counts(&mut counts);
        counts
    }

    fn add_leaf_counts(&self, counts: &mut LeafCounts) {
        if self.is_leaf() {
            match &self.status {
                Some(Status::Passed) => counts.passed += 1,
                Some(Status::Failed) => counts.failed += 1,
                Some(Status::Timeout) => counts.timed_out += 1,
                Some(Status::Unknown) | None => counts.unknown += 1,
                Some(Status::Other(_)) => counts.other += 1,
            }
        } else {
            for child in &self.children {
                child.add_leaf_counts(counts);
            }
        }
    }
}

/// Leaf counts by status, as returned by [`ResultNode::leaf_counts`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LeafCounts {
    /// Leaves with status `passed`.
    pub passed: usize,
    /// Leaves with status `failed`.
    pub failed: usize,
    /// Leaves with status `timeout`.
    pub timed_out: usize,
    /// Leaves with status `unknown`, or with no status.
    pub unknown: usize,
    /// Leaves with a status outside of harvest's vocabulary.
    pub other: usize,
}

impl LeafCounts {
    /// The total number of leaves.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.timed_out + self.unknown + self.other
    }
}

// An empty status string is the same as no status at all.
fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<Cow<'de, str>>::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty())
        .map(|s| Status::from(s.into_owned())))
}
