// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{DecodeArtifact, detail_keys};
use crate::errors::DecodeError;
use harvest_metadata::{ResultNode, Status};

/// Decoder for opaque artifacts.
///
/// Never fails: the artifact becomes a single passing leaf carrying its contents, decoded
/// lossily as UTF-8.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawDecoder;

impl DecodeArtifact for RawDecoder {
    fn decode(&self, bytes: &[u8], name: &str) -> Result<ResultNode, DecodeError> {
        Ok(ResultNode::leaf(name, Status::Passed)
            .with_detail(detail_keys::CONTENTS, String::from_utf8_lossy(bytes)))
    }
}
