// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembling a plugin's on-disk results into a result tree.
//!
//! Plugins write their results under a results root:
//!
//! ```text
//! <results-root>/plugins/<plugin>/results/<target>/<result files...>
//! <results-root>/plugins/<plugin>/errors/<target>/<error artifacts...>
//! ```
//!
//! `<target>` is [`GLOBAL_TARGET`] for [`Driver::Job`] plugins, and the name of each node for
//! [`Driver::Daemonset`] plugins.
//!
//! The [`Assembler`] turns this layout into an unaggregated tree. Problems encountered along
//! the way never abort assembly: each one becomes a synthetic leaf in the tree and a
//! [`CollectionError`] in the returned list. [`collect_plugin`] additionally aggregates the
//! tree.

mod error_artifact;

use crate::{
    aggregate::aggregate_tree,
    config::CollectThreads,
    decode::detail_keys,
    errors::{AssemblerBuildError, CollectionError, DisplayErrorChain},
    plugin::{Driver, PluginDescriptor, ResultFormat},
    select::select,
};
use camino::{Utf8Path, Utf8PathBuf};
use futures::prelude::*;
use harvest_metadata::{ResultNode, Status};
use std::{collections::BTreeSet, io, time::Duration};
use tokio::{runtime::Runtime, sync::Semaphore};
use tracing::{debug, info, warn};

/// The target directory name used by [`Driver::Job`] plugins.
pub const GLOBAL_TARGET: &str = "global";

/// The directory, under a plugin directory, holding result files.
pub const RESULTS_DIR: &str = "results";

/// The directory, under a plugin directory, holding error artifacts.
pub const ERRORS_DIR: &str = "errors";

/// Returns the directory holding everything a plugin wrote under `results_root`.
pub fn plugin_dir(results_root: &Utf8Path, plugin: &str) -> Utf8PathBuf {
    results_root.join("plugins").join(plugin)
}

/// Options for an [`Assembler`].
#[derive(Debug, Default)]
pub struct AssemblerBuilder {
    threads: Option<CollectThreads>,
    read_timeout: Option<Duration>,
}

impl AssemblerBuilder {
    /// Sets the number of artifacts to read simultaneously.
    ///
    /// This bounds reads across all nodes, not per node.
    pub fn set_threads(&mut self, threads: CollectThreads) -> &mut Self {
        self.threads = Some(threads);
        self
    }

    /// Sets the maximum time to spend reading a single artifact.
    pub fn set_read_timeout(&mut self, read_timeout: Duration) -> &mut Self {
        self.read_timeout = Some(read_timeout);
        self
    }

    /// Creates a new assembler.
    pub fn build(self) -> Result<Assembler, AssemblerBuildError> {
        let threads = self
            .threads
            .unwrap_or(CollectThreads::NumCpus)
            .compute()
            .max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(threads)
            .thread_name("harvest-collector-worker")
            .build()
            .map_err(AssemblerBuildError::TokioRuntimeCreate)?;

        Ok(Assembler {
            runtime,
            threads,
            reads: Semaphore::new(threads),
            read_timeout: self.read_timeout,
        })
    }
}

/// Collects plugin results from disk into unaggregated result trees.
///
/// Created through an [`AssemblerBuilder`].
#[derive(Debug)]
pub struct Assembler {
    runtime: Runtime,
    threads: usize,
    // Shared by every node and target, so nested streams never exceed `threads` reads.
    reads: Semaphore,
    read_timeout: Option<Duration>,
}

impl Assembler {
    /// Assembles the results of `plugin` found under `results_root`.
    ///
    /// Returns the plugin's root node, with statuses not yet aggregated, along with every error
    /// encountered while collecting. Children appear in a deterministic order: nodes sorted by
    /// name, then within a target, result files in selection order followed by error artifacts
    /// sorted by name.
    pub fn assemble(
        &self,
        plugin: &PluginDescriptor,
        results_root: &Utf8Path,
    ) -> (ResultNode, Vec<CollectionError>) {
        let plugin_dir = plugin_dir(results_root, plugin.name());
        debug!(
            plugin = plugin.name(),
            driver = %plugin.driver(),
            format = %plugin.result_format(),
            "assembling results from {plugin_dir}",
        );

        let (children, errors) = self
            .runtime
            .block_on(self.assemble_plugin(plugin, &plugin_dir));
        let root = ResultNode::branch(plugin.name(), children)
            .with_detail(detail_keys::TYPE, detail_keys::TYPE_SUMMARY);
        (root, errors)
    }

    async fn assemble_plugin(
        &self,
        plugin: &PluginDescriptor,
        plugin_dir: &Utf8Path,
    ) -> (Vec<ResultNode>, Vec<CollectionError>) {
        match plugin.driver() {
            Driver::Job => self.assemble_target(plugin, plugin_dir, GLOBAL_TARGET).await,
            Driver::Daemonset => {
                let mut errors = Vec::new();
                let nodes = node_names(plugin_dir, &mut errors).await;

                let mut assembled: Vec<_> = stream::iter(nodes.into_iter().enumerate())
                    .map(|(index, node)| async move {
                        let (children, errors) =
                            self.assemble_target(plugin, plugin_dir, &node).await;
                        let branch = ResultNode::branch(node, children)
                            .with_detail(detail_keys::TYPE, detail_keys::TYPE_NODE);
                        (index, branch, errors)
                    })
                    .buffer_unordered(self.threads)
                    .collect()
                    .await;
                assembled.sort_unstable_by_key(|(index, _, _)| *index);

                let mut branches = Vec::with_capacity(assembled.len());
                for (_, branch, node_errors) in assembled {
                    branches.push(branch);
                    errors.extend(node_errors);
                }
                (branches, errors)
            }
        }
    }

    /// Collects the results and error artifacts for one target.
    async fn assemble_target(
        &self,
        plugin: &PluginDescriptor,
        plugin_dir: &Utf8Path,
        target: &str,
    ) -> (Vec<ResultNode>, Vec<CollectionError>) {
        let mut errors = Vec::new();

        let results_dir = TargetDir::new(plugin_dir, RESULTS_DIR, target);
        let present = list_target(&results_dir.path, &mut errors).await;
        let selected = select(plugin.result_files(), &present);
        debug!(
            plugin = plugin.name(),
            dir = %results_dir.path,
            "selected {} of {} result files",
            selected.len(),
            present.len(),
        );
        let format = plugin.result_format();
        let mut children = self
            .collect_artifacts(&results_dir, selected, ArtifactKind::Result(format))
            .await;

        let errors_dir = TargetDir::new(plugin_dir, ERRORS_DIR, target);
        let error_artifacts = list_target(&errors_dir.path, &mut errors).await;
        children.extend(
            self.collect_artifacts(&errors_dir, error_artifacts, ArtifactKind::Error)
                .await,
        );

        let mut nodes = Vec::with_capacity(children.len());
        for (node, error) in children {
            nodes.push(node);
            errors.extend(error);
        }
        (nodes, errors)
    }

    /// Reads and decodes the given artifacts in parallel, returning them in the given order.
    async fn collect_artifacts(
        &self,
        dir: &TargetDir,
        names: Vec<String>,
        kind: ArtifactKind,
    ) -> Vec<(ResultNode, Option<CollectionError>)> {
        let mut collected: Vec<_> = stream::iter(names.into_iter().enumerate())
            .map(|(index, name)| async move {
                (index, self.collect_artifact(dir, &name, kind).await)
            })
            .buffer_unordered(self.threads)
            .collect()
            .await;
        collected.sort_unstable_by_key(|(index, _)| *index);
        collected.into_iter().map(|(_, node)| node).collect()
    }

    async fn collect_artifact(
        &self,
        dir: &TargetDir,
        name: &str,
        kind: ArtifactKind,
    ) -> (ResultNode, Option<CollectionError>) {
        let path = dir.path.join(name);
        let relative = dir.relative_file(name);
        debug!("collecting {kind} artifact {path}");

        let bytes = match self.read_artifact(path.clone()).await {
            Ok(bytes) => bytes,
            Err(error) => {
                let status = match &error {
                    CollectionError::ReadTimeout { .. } => Status::Timeout,
                    _ => Status::Failed,
                };
                return (collection_error_leaf(name, status, &relative, &error), Some(error));
            }
        };

        match kind {
            ArtifactKind::Result(format) => match format.decoder().decode(&bytes, name) {
                Ok(node) => (
                    node.with_detail(detail_keys::TYPE, detail_keys::TYPE_FILE)
                        .with_detail(detail_keys::FILE, relative),
                    None,
                ),
                Err(error) => {
                    let error = CollectionError::Decode {
                        path,
                        format,
                        error,
                    };
                    (
                        collection_error_leaf(name, Status::Failed, &relative, &error),
                        Some(error),
                    )
                }
            },
            ArtifactKind::Error => (
                error_artifact::error_leaf(name, &bytes).with_detail(detail_keys::FILE, relative),
                None,
            ),
        }
    }

    async fn read_artifact(&self, path: Utf8PathBuf) -> Result<Vec<u8>, CollectionError> {
        // The semaphore is never closed.
        let _permit = self.reads.acquire().await.ok();
        let read = tokio::fs::read(&path);
        let result = match self.read_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, read).await {
                Ok(result) => result,
                Err(_) => return Err(CollectionError::ReadTimeout { path, timeout }),
            },
            None => read.await,
        };
        result.map_err(|error| CollectionError::ReadArtifact { path, error })
    }
}

/// The results of collecting a plugin, with statuses aggregated.
#[derive(Debug)]
pub struct PluginResults {
    /// The status-resolved root of the plugin's result tree.
    pub root: ResultNode,

    /// The overall status of the plugin: `passed`, `failed` or `unknown`.
    pub status: Status,

    /// Errors encountered while collecting. Artifacts that could not be read or decoded also
    /// appear in the tree as failed (or timed out) leaves.
    pub errors: Vec<CollectionError>,
}

/// Assembles the results of `plugin` and aggregates their statuses.
///
/// Collection errors are logged as warnings as well as returned.
pub fn collect_plugin(
    assembler: &Assembler,
    plugin: &PluginDescriptor,
    results_root: &Utf8Path,
) -> PluginResults {
    let (mut root, errors) = assembler.assemble(plugin, results_root);
    for error in &errors {
        warn!("{}", DisplayErrorChain::new(error));
    }

    let status = aggregate_tree(&mut root);
    let counts = root.leaf_counts();
    info!(
        plugin = plugin.name(),
        %status,
        leaves = counts.total(),
        errors = errors.len(),
        "collected results for plugin `{}`: {status}",
        plugin.name(),
    );

    PluginResults {
        root,
        status,
        errors,
    }
}

#[derive(Clone, Copy, Debug)]
enum ArtifactKind {
    Result(ResultFormat),
    Error,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Result(format) => write!(f, "{format} result"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug)]
struct TargetDir {
    // Relative to the plugin directory, always with forward slashes.
    relative: String,
    path: Utf8PathBuf,
}

impl TargetDir {
    fn new(plugin_dir: &Utf8Path, kind: &str, target: &str) -> Self {
        Self {
            relative: format!("{kind}/{target}"),
            path: plugin_dir.join(kind).join(target),
        }
    }

    fn relative_file(&self, name: &str) -> String {
        format!("{}/{name}", self.relative)
    }
}

/// A leaf standing in for an artifact that couldn't be collected.
fn collection_error_leaf(
    name: &str,
    status: Status,
    relative: &str,
    error: &CollectionError,
) -> ResultNode {
    // The path in the error is absolute, so describe the error without it.
    let message = match error {
        CollectionError::ReadArtifact { error, .. } => format!("failed to read artifact: {error}"),
        CollectionError::ReadTimeout { timeout, .. } => {
            format!("timed out after {timeout:?} reading artifact")
        }
        CollectionError::Decode { format, error, .. } => {
            format!("failed to decode artifact as {format}: {error}")
        }
        CollectionError::ListDir { error, .. } => format!("failed to list directory: {error}"),
        CollectionError::InspectEntry { error, .. } => format!("failed to inspect entry: {error}"),
    };
    ResultNode::leaf(name, status)
        .with_detail(detail_keys::TYPE, detail_keys::TYPE_ERROR)
        .with_detail(detail_keys::FILE, relative)
        .with_detail(detail_keys::ERROR, message)
}

/// Returns the node names of a daemonset plugin: every directory under either `results` or
/// `errors`, sorted.
async fn node_names(plugin_dir: &Utf8Path, errors: &mut Vec<CollectionError>) -> Vec<String> {
    let mut nodes = BTreeSet::new();
    for kind in [RESULTS_DIR, ERRORS_DIR] {
        let dir = plugin_dir.join(kind);
        match list_dir(&dir, EntryKind::Dir, errors).await {
            Ok(names) => nodes.extend(names),
            Err(error) => errors.push(CollectionError::ListDir { path: dir, error }),
        }
    }
    nodes.into_iter().collect()
}

/// Lists the files in a target directory, recording an error if it can't be listed.
async fn list_target(dir: &Utf8Path, errors: &mut Vec<CollectionError>) -> Vec<String> {
    match list_dir(dir, EntryKind::File, errors).await {
        Ok(names) => names,
        Err(error) => {
            errors.push(CollectionError::ListDir {
                path: dir.to_owned(),
                error,
            });
            Vec::new()
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EntryKind {
    File,
    Dir,
}

/// Lists the names of the entries of the given kind in `dir`, sorted. Symlinks are followed.
///
/// A missing directory has no entries. Entries that can't be inspected are recorded in `errors`
/// and skipped; if listing stops partway, the entries found so far are kept.
async fn list_dir(
    dir: &Utf8Path,
    kind: EntryKind,
    errors: &mut Vec<CollectionError>,
) -> io::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };

    let mut names = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                errors.push(CollectionError::ListDir {
                    path: dir.to_owned(),
                    error,
                });
                break;
            }
        };
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                warn!("in {dir}, skipping non-UTF-8 name {}", name.to_string_lossy());
                continue;
            }
        };

        let path = dir.join(&name);
        let file_type = match entry.file_type().await {
            Ok(file_type) if file_type.is_symlink() => match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata.file_type(),
                Err(error) => {
                    errors.push(CollectionError::InspectEntry { path, error });
                    continue;
                }
            },
            Ok(file_type) => file_type,
            Err(error) => {
                errors.push(CollectionError::InspectEntry { path, error });
                continue;
            }
        };
        let matches = match kind {
            EntryKind::File => file_type.is_file(),
            EntryKind::Dir => file_type.is_dir(),
        };
        if matches {
            names.push(name);
        }
    }

    names.sort_unstable();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use camino_tempfile_ext::prelude::*;
    use pretty_assertions::assert_eq;

    fn assembler() -> Assembler {
        let mut builder = AssemblerBuilder::default();
        builder.set_threads(CollectThreads::Count(2));
        builder.build().expect("assembler built")
    }

    fn results_root() -> Utf8TempDir {
        camino_tempfile::Builder::new()
            .prefix("harvest-assemble-")
            .tempdir()
            .expect("created temp dir")
    }

    #[test]
    fn missing_plugin_dir_is_empty() {
        let root = results_root();
        let plugin = PluginDescriptor::new("e2e", Driver::Job, ResultFormat::Raw);
        let (node, errors) = assembler().assemble(&plugin, root.path());

        assert!(errors.is_empty(), "errors: {errors:?}");
        assert_eq!(node, ResultNode::new("e2e").with_detail("type", "summary"));
    }

    #[test]
    fn job_raw_results_and_errors() {
        let root = results_root();
        let plugin_dir = root.child("plugins/logs");
        plugin_dir
            .child("results/global/b.log")
            .write_str("second")
            .unwrap();
        plugin_dir
            .child("results/global/a.log")
            .write_str("first")
            .unwrap();
        plugin_dir
            .child("results/global/subdir/ignored.log")
            .write_str("nested files aren't results")
            .unwrap();
        plugin_dir
            .child("errors/global/error.json")
            .write_str(r#"{"error": "container exited with code 1"}"#)
            .unwrap();

        let plugin = PluginDescriptor::new("logs", Driver::Job, ResultFormat::Raw);
        let (node, errors) = assembler().assemble(&plugin, root.path());

        assert!(errors.is_empty(), "errors: {errors:?}");
        assert_eq!(
            node,
            ResultNode::branch(
                "logs",
                vec![
                    ResultNode::leaf("a.log", Status::Passed)
                        .with_detail("contents", "first")
                        .with_detail("file", "results/global/a.log")
                        .with_detail("type", "file"),
                    ResultNode::leaf("b.log", Status::Passed)
                        .with_detail("contents", "second")
                        .with_detail("file", "results/global/b.log")
                        .with_detail("type", "file"),
                    ResultNode::leaf("error.json", Status::Failed)
                        .with_detail("error", "container exited with code 1")
                        .with_detail("file", "errors/global/error.json")
                        .with_detail("type", "error"),
                ],
            )
            .with_detail("type", "summary"),
        );
    }

    #[test]
    fn malformed_junit_is_isolated() {
        let root = results_root();
        let results = root.child("plugins/e2e/results/global");
        results
            .child("bad.xml")
            .write_str("<testsuite name=\"broken\"><testcase name=\"a\"></testsuite>")
            .unwrap();
        results
            .child("good.xml")
            .write_str(r#"<testsuite name="ok"><testcase name="a"/></testsuite>"#)
            .unwrap();

        let plugin = PluginDescriptor::new("e2e", Driver::Job, ResultFormat::Junit);
        let results = collect_plugin(&assembler(), &plugin, root.path());

        assert_eq!(results.status, Status::Failed);
        assert_eq!(results.errors.len(), 1, "errors: {:?}", results.errors);
        assert!(
            matches!(
                &results.errors[0],
                CollectionError::Decode { path, format: ResultFormat::Junit, .. }
                    if path.file_name() == Some("bad.xml")
            ),
            "unexpected error: {:?}",
            results.errors[0],
        );

        let children = &results.root.children;
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "bad.xml");
        assert_eq!(children[0].status, Some(Status::Failed));
        assert_eq!(
            children[0].details.get("error").map(String::as_str),
            Some("failed to decode artifact as junit: invalid XML"),
        );
        assert_eq!(children[1].name, "good.xml");
        assert_eq!(children[1].status, Some(Status::Passed));
    }

    #[test]
    fn daemonset_nodes_are_union_of_results_and_errors() {
        let root = results_root();
        let plugin_dir = root.child("plugins/systemd-logs");
        plugin_dir
            .child("results/node-b/journal.log")
            .write_str("ok")
            .unwrap();
        plugin_dir
            .child("errors/node-a/error.json")
            .write_str(r#"{"error": "plugin timeout"}"#)
            .unwrap();
        // An empty node directory has no results at all.
        plugin_dir.child("results/node-c").create_dir_all().unwrap();

        let plugin = PluginDescriptor::new("systemd-logs", Driver::Daemonset, ResultFormat::Raw);
        let results = collect_plugin(&assembler(), &plugin, root.path());

        assert!(results.errors.is_empty(), "errors: {:?}", results.errors);
        assert_eq!(results.status, Status::Failed);
        let nodes: Vec<_> = results
            .root
            .children
            .iter()
            .map(|node| (node.name.as_str(), node.status_str()))
            .collect();
        assert_eq!(
            nodes,
            [
                ("node-a", "failed"),
                ("node-b", "passed"),
                ("node-c", "unknown"),
            ]
        );
        assert_eq!(
            results.root.children[0].children[0].status,
            Some(Status::Timeout)
        );
    }

    #[test]
    fn unlistable_target_is_an_error() {
        let root = results_root();
        // A file where the target directory should be.
        root.child("plugins/e2e/results/global")
            .write_str("not a directory")
            .unwrap();

        let plugin = PluginDescriptor::new("e2e", Driver::Job, ResultFormat::Junit);
        let (node, errors) = assembler().assemble(&plugin, root.path());

        assert_eq!(errors.len(), 1, "errors: {errors:?}");
        assert!(
            matches!(&errors[0], CollectionError::ListDir { path, .. } if path.ends_with("results/global")),
            "unexpected error: {:?}",
            errors[0],
        );
        assert!(node.children.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_results_are_followed() {
        let root = results_root();
        let results = root.child("plugins/e2e/results/global");
        results
            .child("real.xml")
            .write_str(r#"<testsuite name="ok"><testcase name="a"/></testsuite>"#)
            .unwrap();
        std::os::unix::fs::symlink("real.xml", results.child("link.xml")).unwrap();

        let plugin = PluginDescriptor::new("e2e", Driver::Job, ResultFormat::Junit)
            .with_result_files(["link.xml"]);
        let results = collect_plugin(&assembler(), &plugin, root.path());

        assert!(results.errors.is_empty(), "errors: {:?}", results.errors);
        assert_eq!(results.status, Status::Passed);
        let children: Vec<_> = results
            .root
            .children
            .iter()
            .map(|node| (node.name.as_str(), node.status_str()))
            .collect();
        assert_eq!(children, [("link.xml", "passed")]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_keeps_siblings() {
        let root = results_root();
        let results = root.child("plugins/logs/results/global");
        results.child("journal.log").write_str("ok").unwrap();
        std::os::unix::fs::symlink("gone.log", results.child("broken.log")).unwrap();

        let plugin = PluginDescriptor::new("logs", Driver::Job, ResultFormat::Raw);
        let (node, errors) = assembler().assemble(&plugin, root.path());

        assert_eq!(errors.len(), 1, "errors: {errors:?}");
        assert!(
            matches!(
                &errors[0],
                CollectionError::InspectEntry { path, .. } if path.file_name() == Some("broken.log")
            ),
            "unexpected error: {:?}",
            errors[0],
        );
        let names: Vec<_> = node.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["journal.log"]);
    }

    #[test]
    fn reads_share_one_limit() {
        let mut builder = AssemblerBuilder::default();
        builder.set_threads(CollectThreads::Count(3));
        let assembler = builder.build().expect("assembler built");
        assert_eq!(assembler.reads.available_permits(), 3);
    }

    #[test]
    fn plugin_dir_layout() {
        assert_eq!(
            plugin_dir(Utf8Path::new("/tmp/results"), "e2e"),
            Utf8PathBuf::from("/tmp/results/plugins/e2e"),
        );
    }
}
