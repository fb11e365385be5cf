//! Arguments and setup shared by all commands.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use metric_catalog::config::Config;
use metric_catalog::{Color, MetricCatalog, RegionDb, Result};
use owo_colors::OwoColorize;
use std::io::{IsTerminal, stdout};

/// Controls when to use colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments accepted by every command
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to configuration file [default: one of catalog.[toml|yml|yaml|json] ]
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Region dataset to use instead of the configured one
    #[arg(long, value_name = "PATH", global = true)]
    pub regions: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto", global = true)]
    pub color: ColorMode,
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}

pub fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }

    eprintln!("\n⚠️  Configuration validation warnings:");
    for warning in warnings {
        eprintln!("   {warning}");
    }
    eprintln!();
}

/// The loaded configuration plus the console settings of one invocation.
#[derive(Debug)]
pub struct Common {
    pub config: Config,
    pub painter: Painter,
    regions_override: Option<Utf8PathBuf>,
}

impl Common {
    /// Load the configuration and report its warnings.
    pub fn new(args: &CommonArgs) -> Result<Self> {
        let (config, warnings) = Config::load(Utf8Path::new("."), args.config.as_deref())?;
        print_warnings(&warnings);

        Ok(Self {
            config,
            painter: Painter::new(args.color),
            regions_override: args.regions.clone(),
        })
    }

    pub fn catalog(&self) -> Result<MetricCatalog> {
        self.config.build_catalog()
    }

    pub fn regions(&self) -> Result<RegionDb> {
        self.config.load_regions(self.regions_override.as_deref())
    }
}

/// Applies terminal styling when colors are enabled.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(mode: ColorMode) -> Self {
        let enabled = matches!(mode, ColorMode::Always) || (matches!(mode, ColorMode::Auto) && stdout().is_terminal());
        Self { enabled }
    }

    #[cfg(test)]
    pub const fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn color(self, text: &str, color: Color) -> String {
        if self.enabled {
            text.truecolor(color.red(), color.green(), color.blue()).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn bold(self, text: &str) -> String {
        if self.enabled { text.bold().to_string() } else { text.to_string() }
    }

    pub fn dimmed(self, text: &str) -> String {
        if self.enabled { text.dimmed().to_string() } else { text.to_string() }
    }
}
