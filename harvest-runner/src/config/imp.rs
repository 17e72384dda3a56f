// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::CollectThreads;
use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, PluginNotFound},
    plugin::{Driver, PluginDescriptor, ResultFormat},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
    time::Duration,
};
use tracing::warn;

/// Trait for handling configuration warnings.
///
/// Warnings are logged by default ([`DefaultConfigWarnings`]); tests collect them instead.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if let [single] = unknown.iter().collect::<Vec<_>>().as_slice() {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.push_str(single);
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

/// Gets the number of available CPUs and caches the value.
#[inline]
pub fn get_num_cpus() -> usize {
    static NUM_CPUS: LazyLock<usize> =
        LazyLock::new(|| match std::thread::available_parallelism() {
            Ok(count) => count.into(),
            Err(err) => {
                warn!("unable to determine num-cpus ({err}), assuming 1 logical CPU");
                1
            }
        });

    *NUM_CPUS
}

/// Overall configuration for harvest.
///
/// Built from the default config embedded in harvest, overlaid with an optional user config
/// file. See `default-config.toml` for the available keys.
#[derive(Clone, Debug)]
pub struct HarvestConfig {
    config_file: Option<Utf8PathBuf>,
    collect: CollectConfig,
    plugins: BTreeMap<String, PluginDescriptor>,
}

impl HarvestConfig {
    /// The default configuration, embedded in harvest.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The file name used to refer to the embedded default configuration in errors.
    pub const DEFAULT_CONFIG_NAME: &'static str = "<default config>";

    /// Reads the harvest config from the given file, if any, layered over the defaults.
    ///
    /// Unknown keys are logged as warnings.
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(config_file, &mut DefaultConfigWarnings)
    }

    /// Reads the harvest config with custom warning handling.
    pub fn from_sources_with_warnings(
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }
        let error_file = config_file.unwrap_or(Utf8Path::new(Self::DEFAULT_CONFIG_NAME));

        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(error_file, kind))?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(error_file, &unknown);
        }

        let plugins = deserialized
            .plugins
            .into_iter()
            .map(|(name, plugin)| {
                let descriptor = PluginDescriptor::new(&name, plugin.driver, plugin.result_format)
                    .with_result_files(plugin.result_files);
                (name, descriptor)
            })
            .collect();

        Ok(Self {
            config_file: config_file.map(ToOwned::to_owned),
            collect: CollectConfig {
                threads: deserialized.collect.threads,
                read_timeout: deserialized.collect.read_timeout,
            },
            plugins,
        })
    }

    /// Returns the user config file this config was read from, if any.
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }

    /// Returns the `[collect]` section.
    pub fn collect(&self) -> &CollectConfig {
        &self.collect
    }

    /// Returns the names of all declared plugins, in sorted order.
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Returns the descriptor for the plugin with the given name.
    pub fn plugin(&self, name: &str) -> Result<PluginDescriptor, PluginNotFound> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| PluginNotFound::new(name, self.plugin_names()))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(HarvestConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: HarvestConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key: drop it in favor of the full path.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// The `[collect]` section of the harvest config.
#[derive(Clone, Debug)]
pub struct CollectConfig {
    threads: CollectThreads,
    read_timeout: Option<Duration>,
}

impl CollectConfig {
    /// The number of artifacts and nodes collected in parallel.
    pub fn threads(&self) -> CollectThreads {
        self.threads
    }

    /// The maximum time to spend reading a single artifact, if any.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HarvestConfigDeserialize {
    collect: CollectConfigDeserialize,
    #[serde(default)]
    plugins: BTreeMap<String, PluginConfigDeserialize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CollectConfigDeserialize {
    threads: CollectThreads,
    #[serde(default, with = "humantime_serde")]
    read_timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PluginConfigDeserialize {
    driver: Driver,
    #[serde(default)]
    result_format: ResultFormat,
    #[serde(default)]
    result_files: Vec<String>,
}
