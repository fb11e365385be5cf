use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use metric_catalog::Result;
use metric_catalog::config::{Config, DEFAULT_CONFIG_TOML};
use ohno::{IntoAppError, bail};
use std::fs;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output configuration file path
    #[arg(value_name = "PATH", default_value = "catalog.toml")]
    pub output: Utf8PathBuf,

    /// Overwrite the file if it already exists
    #[arg(long)]
    pub force: bool,
}

pub fn init_config(args: &InitArgs) -> Result<()> {
    if !args.force && args.output.exists() {
        bail!("'{}' already exists, use --force to overwrite it", args.output);
    }

    // TOML keeps the commented template, other formats go through serde
    if args.output.extension() == Some("toml") {
        fs::write(&args.output, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing configuration to {}", args.output))?;
    } else {
        let base_dir = args.output.parent().unwrap_or_else(|| Utf8Path::new("."));
        Config::default_config(base_dir)?.save(&args.output)?;
    }

    println!("Generated default configuration file: {}", args.output);
    Ok(())
}
