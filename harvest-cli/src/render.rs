// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable rendering of result trees.

use harvest_metadata::{LeafCounts, ResultNode, Status};
use harvest_runner::decode::detail_keys;
use itertools::Itertools;
use owo_colors::{OwoColorize, Style, style};
use std::io::{self, Write};

/// Details printed under a leaf, in this order.
const SHOWN_DETAILS: &[&str] = &[
    detail_keys::FAILURE,
    detail_keys::ERROR,
    detail_keys::SKIPPED,
];

const INDENT: usize = 2;

#[derive(Debug, Default)]
pub(crate) struct TreeStyles {
    passed: Style,
    failed: Style,
    timeout: Style,
    unknown: Style,
    other: Style,
    detail: Style,
    count: Style,
}

impl TreeStyles {
    pub(crate) fn colorize(&mut self) {
        self.passed = style().green().bold();
        self.failed = style().red().bold();
        self.timeout = style().purple().bold();
        self.unknown = style().yellow().bold();
        self.other = style().cyan();
        self.detail = style().dimmed();
        self.count = style().bold();
    }

    fn status(&self, status: Option<&Status>) -> Style {
        match status {
            Some(Status::Passed) => self.passed,
            Some(Status::Failed) => self.failed,
            Some(Status::Timeout) => self.timeout,
            Some(Status::Unknown) | None => self.unknown,
            Some(Status::Other(_)) => self.other,
        }
    }
}

/// Writes `root` as an indented tree, followed by a blank line and a summary.
pub(crate) fn write_tree(
    root: &ResultNode,
    collection_errors: usize,
    styles: &TreeStyles,
    writer: &mut dyn Write,
) -> io::Result<()> {
    write_node(root, 0, styles, writer)?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{}",
        summary_line(root, collection_errors, styles)
    )
}

fn write_node(
    node: &ResultNode,
    depth: usize,
    styles: &TreeStyles,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let indent = depth * INDENT;
    let status = format!("{:>7}", status_label(node));
    writeln!(
        writer,
        "{:indent$}[{}] {}",
        "",
        status.style(styles.status(node.status.as_ref())),
        node.name,
    )?;

    if node.is_leaf() {
        let detail_indent = indent + INDENT;
        for key in SHOWN_DETAILS {
            let Some(value) = node.details.get(*key) else {
                continue;
            };
            for line in value.lines() {
                writeln!(
                    writer,
                    "{:detail_indent$}{}",
                    "",
                    line.style(styles.detail)
                )?;
            }
        }
    }

    for child in &node.children {
        write_node(child, depth + 1, styles, writer)?;
    }
    Ok(())
}

/// Returns a one-line summary of the root's status and its leaf counts.
pub(crate) fn summary_line(
    root: &ResultNode,
    collection_errors: usize,
    styles: &TreeStyles,
) -> String {
    let LeafCounts {
        passed,
        failed,
        timed_out,
        unknown,
        other,
    } = root.leaf_counts();

    let mut parts = vec![
        format!("{} passed", passed.style(styles.count)),
        format!("{} failed", failed.style(styles.count)),
        format!("{} timed out", timed_out.style(styles.count)),
        format!("{} unknown", unknown.style(styles.count)),
    ];
    if other > 0 {
        parts.push(format!("{} other", other.style(styles.count)));
    }

    let errors = (collection_errors > 0).then(|| {
        format!(
            "; {} {}",
            collection_errors.style(styles.failed),
            plural(collection_errors, "collection error", "collection errors"),
        )
    });

    let total = passed + failed + timed_out + unknown + other;
    format!(
        "{}: {} {} ({}){}",
        status_label(root).style(styles.status(root.status.as_ref())),
        total.style(styles.count),
        plural(total, "result", "results"),
        parts.iter().join(", "),
        errors.unwrap_or_default(),
    )
}

fn status_label(node: &ResultNode) -> &str {
    match &node.status {
        Some(status) => status.as_str(),
        None => "unset",
    }
}

fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}
