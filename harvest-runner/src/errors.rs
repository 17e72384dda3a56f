// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by harvest.

use crate::plugin::{Driver, ResultFormat};
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt, time::Duration};
use thiserror::Error;

/// An error that occurred while collecting a single artifact or directory.
///
/// Collection errors never abort assembly, which continues with sibling artifacts and nodes.
/// An artifact that can't be read or decoded is also represented by a synthetic leaf in the
/// result tree.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// An artifact could not be read.
    #[error("failed to read artifact `{path}`")]
    ReadArtifact {
        /// The path to the artifact.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Reading an artifact took longer than the configured read timeout.
    #[error("timed out after {timeout:?} reading artifact `{path}`")]
    ReadTimeout {
        /// The path to the artifact.
        path: Utf8PathBuf,

        /// The configured timeout.
        timeout: Duration,
    },

    /// An artifact was read but could not be decoded in its declared format.
    #[error("failed to decode artifact `{path}` as {format}")]
    Decode {
        /// The path to the artifact.
        path: Utf8PathBuf,

        /// The declared result format.
        format: ResultFormat,

        /// The underlying error.
        #[source]
        error: DecodeError,
    },

    /// A directory entry's type could not be determined, for example a dangling symlink.
    #[error("failed to inspect directory entry `{path}`")]
    InspectEntry {
        /// The path to the entry.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A target directory exists but could not be listed.
    #[error("failed to list directory `{path}`")]
    ListDir {
        /// The path to the directory.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

impl CollectionError {
    /// Returns the path to the artifact or directory this error is about.
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::ReadArtifact { path, .. }
            | Self::ReadTimeout { path, .. }
            | Self::Decode { path, .. }
            | Self::ListDir { path, .. }
            | Self::InspectEntry { path, .. } => path,
        }
    }
}

/// An error that occurred while decoding a structured result artifact.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document is not well-formed XML.
    #[error("invalid XML")]
    Xml(#[from] quick_xml::Error),

    /// The document's root element is not a JUnit report element.
    #[error("expected root element `testsuites` or `testsuite`, found `{found}`")]
    UnexpectedRoot {
        /// The name of the root element found.
        found: String,
    },

    /// The document has no root element.
    #[error("document has no root element")]
    MissingRoot,

    /// The document ended before an element was closed.
    #[error("document ended before `{element}` was closed")]
    Truncated {
        /// The innermost element left open.
        element: String,
    },
}

/// An error that occurred while parsing the harvest config.
#[derive(Debug, Error)]
#[error("failed to parse harvest config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the harvest config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// Error returned while parsing a [`ResultFormat`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for result format: {input}\n(known values: {})",
    ResultFormat::variants().join(", "),
)]
pub struct UnknownResultFormat {
    input: String,
}

impl UnknownResultFormat {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`Driver`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for driver: {input}\n(known values: {})",
    Driver::variants().join(", "),
)]
pub struct UnknownDriver {
    input: String,
}

impl UnknownDriver {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurs while parsing a
/// [`CollectThreads`](crate::config::CollectThreads) value.
#[derive(Clone, Debug, Error)]
#[error("unrecognized value for collect threads: {input}")]
pub struct CollectThreadsParseError {
    input: String,
}

impl CollectThreadsParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error which indicates that a plugin was requested but not declared in the config.
#[derive(Clone, Debug, Error)]
pub struct PluginNotFound {
    plugin: String,
    all_plugins: Vec<String>,
}

impl PluginNotFound {
    pub(crate) fn new(
        plugin: impl Into<String>,
        all_plugins: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_plugins: Vec<_> = all_plugins.into_iter().map(|s| s.into()).collect();
        all_plugins.sort_unstable();
        Self {
            plugin: plugin.into(),
            all_plugins,
        }
    }

    /// The name of the plugin that was requested.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }
}

impl fmt::Display for PluginNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin `{}` not found (known plugins: ", self.plugin)?;
        if self.all_plugins.is_empty() {
            write!(f, "(none))")
        } else {
            write!(f, "{})", self.all_plugins.join(", "))
        }
    }
}

/// An error that occurred while building an [`Assembler`](crate::assemble::Assembler).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssemblerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] std::io::Error),
}

/// Displays an error along with its chain of causes.
///
/// ```text
/// failed to decode artifact `plugins/e2e/results/global/junit.xml` as junit
///   caused by:
///   - invalid XML
///   - ill-formed document: expected `</testsuite>`, but `</testcase>` was found
/// ```
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let Some(mut cause) = self.error.source() else {
            return Ok(());
        };

        write!(f, "\n  caused by:")?;
        loop {
            write!(f, "\n  - {cause}")?;
            match cause.source() {
                Some(next) => cause = next,
                None => return Ok(()),
            }
        }
    }
}
