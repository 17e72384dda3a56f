// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use harvest_metadata::HarvestExitCode;
use harvest_runner::errors::{AssemblerBuildError, ConfigParseError, PluginNotFound};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are mostly placeholders. Errors are expected to be printed with
// display_to_stderr, which colorizes them.

/// An error that harvest reports to the user and exits with.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("plugin not found")]
    PluginNotFound {
        #[from]
        err: PluginNotFound,
    },
    #[error("assembler build error")]
    AssemblerBuildError {
        #[from]
        err: AssemblerBuildError,
    },
    #[error("failed to read result tree")]
    ReadTreeError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to parse result tree")]
    ParseTreeError {
        path: Utf8PathBuf,
        #[source]
        err: serde_json::Error,
    },
    #[error("failed to write output")]
    WriteOutputError {
        /// The output file, or `None` for standard output.
        path: Option<Utf8PathBuf>,
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn write_output(path: Option<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::WriteOutputError { path, err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. }
            | Self::PluginNotFound { .. }
            | Self::AssemblerBuildError { .. }
            | Self::ReadTreeError { .. }
            | Self::ParseTreeError { .. } => HarvestExitCode::SETUP_ERROR,
            Self::WriteOutputError { .. } => HarvestExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse harvest config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::PluginNotFound { err } => {
                error!("{err}");
                None
            }
            Self::AssemblerBuildError { err } => {
                error!("failed to set up result collection");
                Some(err as &dyn Error)
            }
            Self::ReadTreeError { path, err } => {
                error!("failed to read result tree at `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ParseTreeError { path, err } => {
                error!(
                    "failed to parse result tree at `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { path, err } => {
                match path {
                    Some(path) => error!("failed to write output to `{}`", path.style(styles.bold)),
                    None => error!("failed to write output to standard output"),
                }
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
