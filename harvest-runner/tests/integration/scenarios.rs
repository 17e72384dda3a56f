// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use harvest_metadata::{ResultNode, Status};
use harvest_runner::{
    aggregate::aggregate_tree,
    assemble::collect_plugin,
    errors::CollectionError,
    plugin::{Driver, PluginDescriptor, ResultFormat},
};
use pretty_assertions::assert_eq;

fn names(node: &ResultNode) -> Vec<&str> {
    node.children.iter().map(|child| child.name.as_str()).collect()
}

#[test]
fn declared_result_files_only() -> Result<()> {
    let results = MockResults::new()?;
    results
        .result("e2e", "global", "output.xml", PASSING_SUITE)?
        .result("e2e", "global", "output2.xml", FAILING_SUITE)?
        .result("e2e", "global", "scratch.log", "scratch space\n")?;

    let plugin = PluginDescriptor::new("e2e", Driver::Job, ResultFormat::Junit)
        .with_result_files(["output.xml"]);
    let collected = collect_plugin(&assembler(), &plugin, results.root());

    ensure!(collected.errors.is_empty(), "errors: {:?}", collected.errors);
    assert_eq!(names(&collected.root), ["output.xml"]);
    // output2.xml fails, so it must not have been decoded.
    assert_eq!(collected.status, Status::Passed);
    Ok(())
}

#[test]
fn declared_order_overrides_listing_order() -> Result<()> {
    let results = MockResults::new()?;
    results
        .result("e2e", "global", "a.xml", PASSING_SUITE)?
        .result("e2e", "global", "b.xml", PASSING_SUITE)?;

    let plugin = PluginDescriptor::new("e2e", Driver::Job, ResultFormat::Junit)
        .with_result_files(["b.xml", "missing.xml", "a.xml"]);
    let collected = collect_plugin(&assembler(), &plugin, results.root());

    ensure!(collected.errors.is_empty(), "errors: {:?}", collected.errors);
    assert_eq!(names(&collected.root), ["b.xml", "a.xml"]);
    Ok(())
}

#[test]
fn per_node_timeout_and_pass() -> Result<()> {
    let results = MockResults::new()?;
    results
        .error("e2e-ds", "node1", "error.json", TIMEOUT_ERROR)?
        .result("e2e-ds", "node2", "junit.xml", PASSING_SUITE)?;

    let plugin = PluginDescriptor::new("e2e-ds", Driver::Daemonset, ResultFormat::Junit);
    let collected = collect_plugin(&assembler(), &plugin, results.root());

    ensure!(collected.errors.is_empty(), "errors: {:?}", collected.errors);
    assert_eq!(collected.status, Status::Failed);
    assert_eq!(collected.root.status, Some(Status::Failed));
    assert_eq!(names(&collected.root), ["node1", "node2"]);

    let node1 = &collected.root.children[0];
    assert_eq!(node1.status, Some(Status::Failed));
    assert_eq!(node1.children.len(), 1);
    assert_eq!(node1.children[0].status, Some(Status::Timeout));

    let node2 = &collected.root.children[1];
    assert_eq!(node2.status, Some(Status::Passed));
    Ok(())
}

#[test]
fn per_node_failures_are_fully_populated() -> Result<()> {
    let results = MockResults::new()?;
    results
        .result("e2e-ds", "node1", "junit.xml", FAILING_SUITE)?
        .result("e2e-ds", "node2", "junit.xml", FAILING_SUITE)?;

    let plugin = PluginDescriptor::new("e2e-ds", Driver::Daemonset, ResultFormat::Junit);
    let collected = collect_plugin(&assembler(), &plugin, results.root());

    ensure!(collected.errors.is_empty(), "errors: {:?}", collected.errors);
    assert_eq!(collected.status, Status::Failed);
    for node in &collected.root.children {
        // Every level below each node was resolved, not just the first failing node.
        assert_eq!(node.status, Some(Status::Failed), "node {}", node.name);
        let file = &node.children[0];
        assert_eq!(file.status, Some(Status::Failed));
        let suite = &file.children[0];
        assert_eq!(suite.status, Some(Status::Failed));
        assert_eq!(suite.children[0].status, Some(Status::Failed));
    }
    let counts = collected.root.leaf_counts();
    assert_eq!(counts.failed, 2);
    assert_eq!(counts.total(), 2);
    Ok(())
}

#[test]
fn malformed_junit_does_not_stop_siblings() -> Result<()> {
    let results = MockResults::new()?;
    results
        .result("e2e", "global", "a.xml", "<html>not a report</html>")?
        .result("e2e", "global", "b.xml", PASSING_SUITE)?;

    let plugin = PluginDescriptor::new("e2e", Driver::Job, ResultFormat::Junit);
    let collected = collect_plugin(&assembler(), &plugin, results.root());

    assert_eq!(collected.errors.len(), 1, "errors: {:?}", collected.errors);
    ensure!(
        matches!(&collected.errors[0], CollectionError::Decode { .. }),
        "unexpected error: {:?}",
        collected.errors[0]
    );
    assert_eq!(names(&collected.root), ["a.xml", "b.xml"]);
    assert_eq!(collected.root.children[0].status, Some(Status::Failed));
    assert_eq!(collected.root.children[1].status, Some(Status::Passed));
    assert_eq!(collected.status, Status::Failed);
    Ok(())
}

#[test]
fn errors_location_does_not_suppress_results() -> Result<()> {
    let results = MockResults::new()?;
    results
        .result("logs", "global", "journal.log", "ok\n")?
        .error("logs", "global", "error.json", r#"{"error": "pod evicted"}"#)?;

    let plugin = PluginDescriptor::new("logs", Driver::Job, ResultFormat::Raw);
    let collected = collect_plugin(&assembler(), &plugin, results.root());

    ensure!(collected.errors.is_empty(), "errors: {:?}", collected.errors);
    assert_eq!(names(&collected.root), ["journal.log", "error.json"]);
    assert_eq!(collected.status, Status::Failed);
    Ok(())
}

#[test]
fn no_results_is_unknown() -> Result<()> {
    let results = MockResults::new()?;

    for driver in [Driver::Job, Driver::Daemonset] {
        let plugin = PluginDescriptor::new("e2e", driver, ResultFormat::Junit);
        let collected = collect_plugin(&assembler(), &plugin, results.root());
        ensure!(collected.errors.is_empty(), "errors: {:?}", collected.errors);
        assert_eq!(collected.status, Status::Unknown, "driver {driver}");
    }
    Ok(())
}

#[test]
fn collected_trees_are_stable_under_rollup() -> Result<()> {
    let results = MockResults::new()?;
    results
        .error("e2e-ds", "node1", "error.json", TIMEOUT_ERROR)?
        .result("e2e-ds", "node2", "junit.xml", PASSING_SUITE)?
        .result("e2e-ds", "node3", "junit.xml", FAILING_SUITE)?;

    let plugin = PluginDescriptor::new("e2e-ds", Driver::Daemonset, ResultFormat::Junit);
    let collected = collect_plugin(&assembler(), &plugin, results.root());

    // Serializing and aggregating again is a no-op.
    let json = serde_json::to_string(&collected.root)?;
    let mut reread: ResultNode = serde_json::from_str(&json)?;
    let status = aggregate_tree(&mut reread);
    assert_eq!(status, collected.status);
    assert_eq!(reread, collected.root);
    Ok(())
}
