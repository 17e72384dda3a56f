// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Golden tests over checked-in results trees.
//!
//! Each case under `testdata/mock-results/<case>` contains:
//!
//! * `harvest.toml`: a config declaring exactly one plugin.
//! * `results/`: the results root for that plugin.
//! * `expected.json`: the status-resolved tree.
//!
//! Set `HARVEST_UPDATE_GOLDEN=1` to rewrite `expected.json` from the current output.

use crate::fixtures::*;
use camino::Utf8Path;
use color_eyre::eyre::{Result, WrapErr, bail};
use harvest_metadata::ResultNode;
use harvest_runner::{assemble::collect_plugin, config::HarvestConfig};
use pretty_assertions::assert_eq;
use test_case::test_case;

const UPDATE_ENV: &str = "HARVEST_UPDATE_GOLDEN";

#[test_case("job-junit-declared", 0 ; "job junit declared")]
#[test_case("job-junit-malformed", 1 ; "job junit malformed")]
#[test_case("job-junit-all", 0 ; "job junit all files")]
#[test_case("job-timeout", 0 ; "job timeout")]
#[test_case("job-raw-default", 0 ; "job raw default format")]
#[test_case("job-raw-declared", 0 ; "job raw declared")]
#[test_case("daemonset-timeout-and-pass", 0 ; "daemonset timeout and pass")]
#[test_case("daemonset-both-failing", 0 ; "daemonset both failing")]
#[test_case("daemonset-raw-declared", 0 ; "daemonset raw declared")]
fn golden(case: &str, expected_errors: usize) -> Result<()> {
    let case_dir = MOCK_RESULTS_DIR.join(case);

    let config_file = case_dir.join("harvest.toml");
    let config = HarvestConfig::from_sources(Some(config_file.as_path()))?;
    let plugin_names: Vec<_> = config.plugin_names().collect();
    let [plugin_name] = plugin_names.as_slice() else {
        bail!("{case}: expected exactly one plugin, found {plugin_names:?}");
    };
    let plugin = config.plugin(plugin_name)?;

    let collected = collect_plugin(&assembler(), &plugin, &case_dir.join("results"));
    assert_eq!(
        collected.errors.len(),
        expected_errors,
        "{case}: errors: {:?}",
        collected.errors
    );

    let expected_path = case_dir.join("expected.json");
    if std::env::var_os(UPDATE_ENV).is_some_and(|v| v == "1") {
        return write_golden(&expected_path, &collected.root);
    }

    let expected = std::fs::read_to_string(&expected_path)
        .wrap_err_with(|| format!("reading {expected_path} (set {UPDATE_ENV}=1 to create it)"))?;
    let expected: ResultNode = serde_json::from_str(&expected)
        .wrap_err_with(|| format!("parsing {expected_path}"))?;
    assert_eq!(collected.root, expected, "{case}: tree doesn't match golden");
    Ok(())
}

fn write_golden(path: &Utf8Path, root: &ResultNode) -> Result<()> {
    let mut json = serde_json::to_string_pretty(root)?;
    json.push('\n');
    std::fs::write(path, json).wrap_err_with(|| format!("writing {path}"))?;
    Ok(())
}
