// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use camino_tempfile_ext::prelude::*;
use color_eyre::eyre::Result;
use harvest_runner::{
    assemble::{Assembler, AssemblerBuilder, ERRORS_DIR, RESULTS_DIR, plugin_dir},
    config::CollectThreads,
};
use indoc::indoc;
use std::{sync::LazyLock, time::Duration};

/// Directory holding checked-in results trees and their expected output.
pub(crate) static MOCK_RESULTS_DIR: LazyLock<Utf8PathBuf> = LazyLock::new(|| {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/mock-results")
});

pub(crate) const PASSING_SUITE: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <testsuites>
      <testsuite name="node checks" tests="1">
        <testcase name="kubelet healthy"></testcase>
      </testsuite>
    </testsuites>
"#};

pub(crate) const FAILING_SUITE: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <testsuites>
      <testsuite name="node checks" tests="1" failures="1">
        <testcase name="kubelet healthy">
          <failure message="kubelet not ready"></failure>
        </testcase>
      </testsuite>
    </testsuites>
"#};

pub(crate) const TIMEOUT_ERROR: &str = r#"{"error": "Plugin timeout while waiting for results so there are no results. Check pod logs or other cluster debugging information for more details."}"#;

pub(crate) fn assembler() -> Assembler {
    let mut builder = AssemblerBuilder::default();
    builder
        .set_threads(CollectThreads::Count(4))
        .set_read_timeout(Duration::from_secs(30));
    builder.build().expect("assembler built")
}

/// A results root in a temporary directory, populated by tests.
pub(crate) struct MockResults {
    dir: Utf8TempDir,
}

impl MockResults {
    pub(crate) fn new() -> Result<Self> {
        let dir = camino_tempfile::Builder::new()
            .prefix("harvest-mock-results-")
            .tempdir()?;
        Ok(Self { dir })
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        self.dir.path()
    }

    /// Writes a result file for `plugin` under `target`.
    pub(crate) fn result(
        &self,
        plugin: &str,
        target: &str,
        name: &str,
        contents: &str,
    ) -> Result<&Self> {
        self.write(plugin, RESULTS_DIR, target, name, contents)
    }

    /// Writes an error artifact for `plugin` under `target`.
    pub(crate) fn error(
        &self,
        plugin: &str,
        target: &str,
        name: &str,
        contents: &str,
    ) -> Result<&Self> {
        self.write(plugin, ERRORS_DIR, target, name, contents)
    }

    fn write(
        &self,
        plugin: &str,
        kind: &str,
        target: &str,
        name: &str,
        contents: &str,
    ) -> Result<&Self> {
        let relative = plugin_dir(Utf8Path::new(""), plugin)
            .join(kind)
            .join(target)
            .join(name);
        self.dir.child(relative).write_str(contents)?;
        Ok(self)
    }
}
