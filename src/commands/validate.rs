use crate::commands::common::{CommonArgs, print_warnings};
use camino::Utf8Path;
use metric_catalog::Result;
use metric_catalog::config::Config;

#[expect(clippy::unnecessary_wraps, reason = "Consistent interface with other subcommands")]
pub fn validate_config(args: &CommonArgs) -> Result<()> {
    let config_path = args.config.as_deref();

    let outcome = Config::load(Utf8Path::new("."), config_path).and_then(|(config, warnings)| {
        let catalog = config.build_catalog()?;
        let regions = config.load_regions(args.regions.as_deref())?;
        Ok((catalog, regions, warnings))
    });

    match outcome {
        Ok((catalog, regions, warnings)) => {
            println!("Configuration validation successful");
            if let Some(path) = config_path {
                println!("Config file: {path}");
            } else {
                println!("Using default configuration when no catalog.[toml|yml|yaml|json] is present");
            }
            println!("{} metric(s), {} provider(s), {} region(s)", catalog.metrics().count(), catalog.provider_ids().len(), regions.len());

            print_warnings(&warnings);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            std::process::exit(1);
        }
    }
}
