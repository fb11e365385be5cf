//! A command-line front end for the metric catalog.
//!
//! # Overview
//!
//! `metric-catalog` loads a set of metric definitions and data providers from a configuration file,
//! fetches the current value and recent history of metrics for a region, and shows each value
//! together with the category it falls into, colored with that category's color.
//!
//! # Quick Start
//!
//! Write the default configuration, which uses synthetic data and a small built-in set of US
//! regions:
//!
//! ```bash
//! metric-catalog init
//! ```
//!
//! Show every configured metric for a region, by id, slug or name:
//!
//! ```bash
//! metric-catalog show 36047
//! metric-catalog show kings-county-ny case_density risk_level
//! metric-catalog show "san francisco" --history 7
//! ```
//!
//! # Commands
//!
//! | Command    | Purpose                                                     |
//! |------------|-------------------------------------------------------------|
//! | `show`     | Fetch and categorize metrics for one region                 |
//! | `metrics`  | List the configured metrics and their categories            |
//! | `regions`  | List regions or search them by id, abbreviation or name     |
//! | `validate` | Check a configuration and print its warnings                |
//! | `init`     | Write the default configuration                             |
//! | `convert`  | Convert a configuration between TOML, YAML and JSON         |
//!
//! # Configuration
//!
//! Without `--config`, the current directory is searched for `catalog.toml`, `catalog.yml`,
//! `catalog.yaml` and `catalog.json`, in that order. When none exists, the built-in default
//! configuration is used. Paths inside a configuration file are relative to the file.
//!
//! A configuration declares:
//!
//! - `providers`: where data comes from. `mock` generates deterministic synthetic series,
//!   `static` reads a CSV file with the columns `region_id,metric_id,date,value`, and `remote`
//!   fetches `{base_url}/{region_id}/{metric_id}.json` over HTTP with an optional disk cache.
//! - `metrics`: each metric names its provider and lists its categories in order. For numeric
//!   metrics a category's `value` is a threshold; a final category without a value catches
//!   everything past the last threshold.
//! - `regions`: an optional region dataset, CSV or JSON.
//!
//! Run `metric-catalog init` to get a commented template.
//!
//! # Logging
//!
//! Diagnostic output is off by default. Use `--log-level info` to see what is loaded and
//! `--log-level debug` to trace cache hits, joins and provider calls. `RUST_LOG` overrides the
//! level for individual modules.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use metric_catalog::Result;

mod commands;

use crate::commands::{
    Common, CommonArgs, ConvertArgs, InitArgs, RegionsArgs, ShowArgs, convert_config, init_config, init_logging, list_metrics,
    list_regions, show, validate_config,
};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "metric-catalog", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch metrics for a region and show their categories
    Show(ShowArgs),
    /// List the configured metrics and their categories
    Metrics,
    /// List or search regions
    Regions(RegionsArgs),
    /// Validate a configuration file
    Validate,
    /// Generate a default configuration file
    Init(InitArgs),
    /// Convert a configuration file between formats
    Convert(ConvertArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.log_level);

    match &cli.command {
        Command::Show(args) => show(&Common::new(&cli.common)?, args).await,
        Command::Metrics => list_metrics(&Common::new(&cli.common)?),
        Command::Regions(args) => list_regions(&Common::new(&cli.common)?, args),
        Command::Validate => validate_config(&cli.common),
        Command::Init(args) => init_config(args),
        Command::Convert(args) => convert_config(args),
    }
}
