// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoders that turn a single result artifact into a [`ResultNode`].
//!
//! The decoder for an artifact is picked by the plugin's [`ResultFormat`]:
//!
//! * [`JunitDecoder`] parses JUnit XML reports into a tree of suites and test cases.
//! * [`RawDecoder`] treats the artifact as opaque: its presence alone is a pass.

mod junit;
mod raw;

pub use junit::JunitDecoder;
pub use raw::RawDecoder;

use crate::{errors::DecodeError, plugin::ResultFormat};
use harvest_metadata::ResultNode;

/// Decodes the contents of one result artifact.
pub trait DecodeArtifact: Send + Sync {
    /// Decodes `bytes`, read from the artifact called `name`.
    ///
    /// The returned node is named after the artifact. Its status may be left unset, in which
    /// case aggregation resolves it.
    fn decode(&self, bytes: &[u8], name: &str) -> Result<ResultNode, DecodeError>;
}

impl ResultFormat {
    /// Returns the decoder for this format.
    pub fn decoder(self) -> &'static dyn DecodeArtifact {
        match self {
            Self::Junit => &JunitDecoder,
            Self::Raw => &RawDecoder,
        }
    }
}

/// Well-known keys in [`ResultNode::details`].
pub mod detail_keys {
    /// The kind of node: one of the `TYPE_*` values.
    pub const TYPE: &str = "type";

    /// The path of the artifact a node was decoded from, relative to the plugin directory.
    pub const FILE: &str = "file";

    /// The raw contents of an opaque artifact.
    pub const CONTENTS: &str = "contents";

    /// An error message.
    pub const ERROR: &str = "error";

    /// The message and text of a JUnit `<failure>` or `<error>` element.
    pub const FAILURE: &str = "failure";

    /// The message and text of a JUnit `<skipped>` element.
    pub const SKIPPED: &str = "skipped";

    /// Captured standard output from a JUnit report.
    pub const SYSTEM_OUT: &str = "system-out";

    /// Captured standard error from a JUnit report.
    pub const SYSTEM_ERR: &str = "system-err";

    /// The `classname` attribute of a JUnit test case.
    pub const CLASSNAME: &str = "classname";

    /// [`TYPE`] of the root node of a plugin.
    pub const TYPE_SUMMARY: &str = "summary";

    /// [`TYPE`] of a per-node branch.
    pub const TYPE_NODE: &str = "node";

    /// [`TYPE`] of a node decoded from a result artifact.
    pub const TYPE_FILE: &str = "file";

    /// [`TYPE`] of a leaf synthesized from an error artifact or a collection error.
    pub const TYPE_ERROR: &str = "error";
}
