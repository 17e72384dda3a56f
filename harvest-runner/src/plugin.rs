// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin descriptors: what harvest needs to know about a plugin to collect its results.

use crate::errors::{UnknownDriver, UnknownResultFormat};
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// Describes a plugin whose results are being collected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PluginDescriptor {
    name: String,
    driver: Driver,
    result_format: ResultFormat,
    result_files: Vec<String>,
}

impl PluginDescriptor {
    /// Creates a new descriptor for a plugin that collects every file it finds.
    pub fn new(name: impl Into<String>, driver: Driver, result_format: ResultFormat) -> Self {
        Self {
            name: name.into(),
            driver,
            result_format,
            result_files: Vec::new(),
        }
    }

    /// Restricts results to the given file names, in the given order.
    ///
    /// An empty list means that every file present is a result.
    pub fn with_result_files(
        mut self,
        result_files: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.result_files = result_files.into_iter().map(Into::into).collect();
        self
    }

    /// The name of the plugin.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the plugin was run.
    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// The format of the plugin's result files.
    pub fn result_format(&self) -> ResultFormat {
        self.result_format
    }

    /// The declared result file names. Empty means all files are results.
    pub fn result_files(&self) -> &[String] {
        &self.result_files
    }
}

/// How a plugin is run on the cluster, which determines the layout of its results.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Driver {
    /// A single pod producing one result set.
    Job,

    /// One pod per node, each producing its own result set.
    Daemonset,
}

impl Driver {
    /// Returns the string values accepted for this type.
    pub fn variants() -> &'static [&'static str] {
        &["job", "daemonset"]
    }

    /// Returns the string form of this driver.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Daemonset => "daemonset",
        }
    }
}

impl FromStr for Driver {
    type Err = UnknownDriver;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job" => Ok(Self::Job),
            "daemonset" => Ok(Self::Daemonset),
            other => Err(UnknownDriver::new(other)),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The format of a plugin's result files.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ResultFormat {
    /// JUnit XML reports.
    Junit,

    /// Opaque files, reported as passing if present.
    #[default]
    Raw,
}

impl ResultFormat {
    /// Returns the string values accepted for this type.
    ///
    /// The empty string is also accepted, as an alias for `raw`.
    pub fn variants() -> &'static [&'static str] {
        &["junit", "raw"]
    }

    /// Returns the string form of this format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Junit => "junit",
            Self::Raw => "raw",
        }
    }
}

impl FromStr for ResultFormat {
    type Err = UnknownResultFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "junit" => Ok(Self::Junit),
            "raw" | "" => Ok(Self::Raw),
            other => Err(UnknownResultFormat::new(other)),
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResultFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
