// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error artifacts: files a plugin (or the harness on its behalf) writes to its errors location
//! when it could not produce results.
//!
//! An error artifact is a JSON object. The `error` key holds the message:
//!
//! ```json
//! {"error": "Plugin timeout while waiting for results", "node": "worker-1"}
//! ```

use crate::decode::detail_keys;
use harvest_metadata::{ResultNode, Status};
use serde_json::{Map, Value};

/// Turns the contents of an error artifact into a leaf.
///
/// Every top-level string field is copied into the leaf's details. Contents that aren't a JSON
/// object are kept verbatim under `error`, and always fail.
pub(super) fn error_leaf(name: &str, bytes: &[u8]) -> ResultNode {
    let mut leaf = ResultNode::new(name);
    let status = match serde_json::from_slice::<Map<String, Value>>(bytes) {
        Ok(fields) => {
            for (key, value) in fields {
                if let Value::String(value) = value {
                    leaf.details.insert(key, value);
                }
            }
            let message = leaf
                .details
                .get(detail_keys::ERROR)
                .map_or("", String::as_str);
            error_status(message)
        }
        Err(_) => {
            leaf.details.insert(
                detail_keys::ERROR.to_owned(),
                String::from_utf8_lossy(bytes).into_owned(),
            );
            Status::Failed
        }
    };
    leaf.status = Some(status);
    leaf.with_detail(detail_keys::TYPE, detail_keys::TYPE_ERROR)
}

/// Returns the status of a leaf recording the error `message`.
pub(super) fn error_status(message: &str) -> Status {
    if message.to_ascii_lowercase().contains("timeout") {
        Status::Timeout
    } else {
        Status::Failed
    }
}
