// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ConfigWarnings, HarvestConfig};
use crate::errors::ConfigParseError;
use camino::Utf8Path;
use camino_tempfile::tempdir;
use camino_tempfile_ext::prelude::*;
use std::collections::BTreeSet;

/// Collects config warnings instead of logging them.
#[derive(Debug, Default)]
pub(crate) struct TestConfigWarnings {
    pub(crate) unknown: Vec<(String, BTreeSet<String>)>,
}

impl ConfigWarnings for TestConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        self.unknown
            .push((config_file.to_string(), unknown.clone()));
    }
}

/// Writes `contents` to a temporary config file and loads it, returning the unknown keys found.
pub(crate) fn load_config(
    contents: &str,
) -> Result<(HarvestConfig, BTreeSet<String>), ConfigParseError> {
    let dir = tempdir().expect("created temp dir");
    let config_file = dir.child("harvest.toml");
    config_file
        .write_str(contents)
        .expect("error writing config file");
    let path = config_file.to_path_buf();

    let mut warnings = TestConfigWarnings::default();
    let config = HarvestConfig::from_sources_with_warnings(Some(path.as_path()), &mut warnings)?;
    let unknown = warnings
        .unknown
        .into_iter()
        .flat_map(|(_, keys)| keys)
        .collect();
    Ok((config, unknown))
}
