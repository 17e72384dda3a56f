// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
    render::{TreeStyles, write_tree},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use harvest_metadata::{HarvestExitCode, ResultNode, Status};
use harvest_runner::{
    aggregate::aggregate_tree,
    assemble::{Assembler, AssemblerBuilder, PluginResults, collect_plugin},
    config::{CollectConfig, CollectThreads, HarvestConfig},
    errors::PluginNotFound,
    plugin::{Driver, PluginDescriptor, ResultFormat},
};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
};
use supports_color::Stream;
use tracing::{debug, info};

/// Collects the results of conformance plugins and rolls them up into one status.
#[derive(Debug, Parser)]
#[command(name = "harvest", version, styles = clap_styles::style())]
pub struct HarvestApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl HarvestApp {
    /// Initializes logging and returns the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code for the process.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Collect(opts) => opts.exec(output, output_writer),
            Command::Rollup(opts) => opts.exec(output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collect a plugin's results and aggregate their statuses
    ///
    /// Results and errors are read from RESULTS_ROOT/plugins/<NAME>/. The resolved tree is
    /// printed, and the exit code reflects the plugin's overall status.
    Collect(CollectOpts),

    /// Re-aggregate a previously collected result tree and print its status
    Rollup(RollupOpts),
}

#[derive(Debug, Args)]
struct CollectOpts {
    /// Directory the plugins wrote their results to
    #[arg(value_name = "RESULTS_ROOT")]
    results_root: Utf8PathBuf,

    /// Name of the plugin to collect
    #[arg(long, short = 'p', value_name = "NAME")]
    plugin: String,

    /// Config file declaring plugins and collection settings
    #[arg(long, value_name = "PATH", env = "HARVEST_CONFIG")]
    config: Option<Utf8PathBuf>,

    #[command(flatten)]
    overrides: PluginOverrides,

    /// Number of nodes and artifacts to collect in parallel [default: from config]
    #[arg(
        long,
        short = 'j',
        value_name = "THREADS",
        allow_negative_numbers = true,
        env = "HARVEST_COLLECT_THREADS"
    )]
    threads: Option<CollectThreads>,

    #[command(flatten)]
    tree_output: TreeOutputOpts,
}

impl CollectOpts {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = HarvestConfig::from_sources(self.config.as_deref())?;
        let plugin = self.overrides.resolve(&config, &self.plugin)?;
        let assembler = self.make_assembler(config.collect())?;

        let collected = collect_plugin(&assembler, &plugin, &self.results_root);
        self.tree_output
            .write_results(&collected, output, output_writer)?;

        Ok(exit_code_for(
            &collected.status,
            collected.errors.len(),
            self.tree_output.fail_on_collection_errors,
        ))
    }

    fn make_assembler(&self, collect: &CollectConfig) -> Result<Assembler> {
        let threads = self.threads.unwrap_or(collect.threads());
        debug!("collecting with {threads} threads");

        let mut builder = AssemblerBuilder::default();
        builder.set_threads(threads);
        if let Some(read_timeout) = collect.read_timeout() {
            builder.set_read_timeout(read_timeout);
        }
        Ok(builder.build()?)
    }
}

/// Command-line overrides for a plugin's descriptor.
#[derive(Debug, Default, Args)]
#[command(next_help_heading = "PLUGIN OPTIONS")]
struct PluginOverrides {
    /// How the plugin was run [default: from config]
    ///
    /// Required if the plugin is not declared in the config.
    #[arg(long, value_name = "DRIVER")]
    driver: Option<Driver>,

    /// Format of the plugin's result files [default: from config, or raw]
    #[arg(long, value_name = "FORMAT")]
    format: Option<ResultFormat>,

    /// Only treat this file as a result (may be repeated)
    #[arg(long = "result-file", value_name = "FILE")]
    result_files: Vec<String>,
}

impl PluginOverrides {
    fn resolve(
        &self,
        config: &HarvestConfig,
        name: &str,
    ) -> Result<PluginDescriptor, PluginNotFound> {
        let declared = match (config.plugin(name), self.driver) {
            (Ok(plugin), _) => plugin,
            // An undeclared plugin can be collected as long as its driver is known.
            (Err(_), Some(driver)) => PluginDescriptor::new(name, driver, ResultFormat::default()),
            (Err(err), None) => return Err(err),
        };

        let driver = self.driver.unwrap_or(declared.driver());
        let format = self.format.unwrap_or(declared.result_format());
        let result_files = if self.result_files.is_empty() {
            declared.result_files().to_vec()
        } else {
            self.result_files.clone()
        };
        Ok(PluginDescriptor::new(name, driver, format).with_result_files(result_files))
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "OUTPUT OPTIONS")]
struct TreeOutputOpts {
    /// Write the result tree to this file instead of standard output
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<Utf8PathBuf>,

    /// Format for the result tree
    #[arg(long, short = 'T', value_enum, default_value_t, value_name = "FMT")]
    message_format: MessageFormat,

    /// Exit with a non-zero code if any artifact could not be collected
    #[arg(long)]
    fail_on_collection_errors: bool,
}

impl TreeOutputOpts {
    fn write_results(
        &self,
        collected: &PluginResults,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let errors = collected.errors.len();
        match &self.output {
            Some(path) => {
                let write = || -> io::Result<()> {
                    let mut file = BufWriter::new(File::create(path)?);
                    self.message_format.write(
                        &collected.root,
                        errors,
                        &TreeStyles::default(),
                        &mut file,
                    )?;
                    file.flush()
                };
                write().map_err(|err| ExpectedError::write_output(Some(path.clone()), err))?;
                info!("wrote result tree to {path}");
            }
            None => {
                let mut styles = TreeStyles::default();
                if output.color.should_colorize(Stream::Stdout) {
                    styles.colorize();
                }
                let mut stdout = output_writer.stdout_writer();
                self.message_format
                    .write(&collected.root, errors, &styles, &mut stdout)
                    .and_then(|()| stdout.flush())
                    .map_err(|err| ExpectedError::write_output(None, err))?;
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormat {
    /// An indented tree followed by a summary
    #[default]
    Human,
    /// The result tree as JSON
    Json,
}

impl MessageFormat {
    fn write(
        self,
        root: &ResultNode,
        collection_errors: usize,
        styles: &TreeStyles,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        match self {
            Self::Human => write_tree(root, collection_errors, styles, writer),
            Self::Json => {
                serde_json::to_writer_pretty(&mut *writer, root)?;
                writeln!(writer)
            }
        }
    }
}

#[derive(Debug, Args)]
struct RollupOpts {
    /// A result tree written by `harvest collect --message-format json`
    #[arg(value_name = "TREE_JSON")]
    tree: Utf8PathBuf,
}

impl RollupOpts {
    fn exec(self, output_writer: &mut OutputWriter) -> Result<i32> {
        let contents =
            std::fs::read_to_string(&self.tree).map_err(|err| ExpectedError::ReadTreeError {
                path: self.tree.clone(),
                err,
            })?;
        let mut root: ResultNode =
            serde_json::from_str(&contents).map_err(|err| ExpectedError::ParseTreeError {
                path: self.tree.clone(),
                err,
            })?;

        let status = aggregate_tree(&mut root);
        let counts = root.leaf_counts();
        debug!(
            "rolled up {} results from {}: {} failed, {} timed out, {} unknown",
            counts.total(),
            self.tree,
            counts.failed,
            counts.timed_out,
            counts.unknown,
        );

        let mut stdout = output_writer.stdout_writer();
        writeln!(stdout, "{status}")
            .and_then(|()| stdout.flush())
            .map_err(|err| ExpectedError::write_output(None, err))?;

        Ok(exit_code_for(&status, 0, false))
    }
}

/// Maps an aggregated status to the exit code for the process.
fn exit_code_for(
    status: &Status,
    collection_errors: usize,
    fail_on_collection_errors: bool,
) -> i32 {
    match status {
        Status::Failed => HarvestExitCode::RUN_FAILED,
        Status::Unknown => HarvestExitCode::RUN_UNKNOWN,
        _ if fail_on_collection_errors && collection_errors > 0 => {
            HarvestExitCode::COLLECTION_ERRORS
        }
        _ => HarvestExitCode::OK,
    }
}
