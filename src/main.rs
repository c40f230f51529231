//! rforce command line tool
//!
//! # Usage
//!
//! ```bash
//! # List the ERA5 parameters the catalog knows about
//! rforce catalog
//!
//! # Print the archive requests still needed for a run
//! rforce request --config run.toml
//!
//! # Turn retrieved files into a ROMS bulk-flux forcing file
//! rforce normalize --input ERA5/ROHO800 --pattern '*.nc' --output roho800_bulk.nc
//! ```
//!
//! `normalize` is only available when built with the `netcdf` feature.
//!
//! Log output goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rforce::io::{open_mfdataset, DatasetWriter, NetcdfCodec, OutputFormat};
use rforce_components::components::{ForcingNormalizer, TransformTable, DEFAULT_TIME_AXIS};
use rforce_core::config::RunConfig;
use rforce_core::request::ModelVariant;
use rforce_core::variable::PARAMETER_CATALOG;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ERA5 to ROMS bulk-flux forcing
#[derive(Parser, Debug)]
#[command(name = "rforce")]
#[command(about = "Request ERA5 variables and normalize them into ROMS bulk-flux forcing")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the parameter catalog in table order
    Catalog {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Build the request for a run and print the archive requests as JSON
    Request {
        /// Run configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Include requests whose target file already exists
        #[arg(long)]
        all: bool,
    },

    /// Normalize retrieved files into a single forcing file
    #[command(hide = !NetcdfCodec::is_available())]
    Normalize {
        /// Directory containing the retrieved files
        #[arg(short, long)]
        input: PathBuf,

        /// Glob matched against file names in the input directory
        #[arg(short, long, default_value = "*.nc")]
        pattern: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// netcdf4, netcdf4-classic or netcdf3-64bit
        #[arg(short, long, default_value = "netcdf4")]
        format: OutputFormat,

        /// Transform rules (TOML); defaults to the ROMS bulk-flux table
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Model variant the retrieval was made for (net-shortwave-model or
        /// downward-shortwave-model); selects the bulk-flux table
        #[arg(long, conflicts_with = "rules", default_value = "net-shortwave-model")]
        variant: ModelVariant,

        /// Axis whose values become the output time coordinate
        #[arg(long, default_value = DEFAULT_TIME_AXIS)]
        time_axis: String,
    },
}

fn print_catalog(json: bool) -> Result<()> {
    if json {
        let entries: Vec<_> = PARAMETER_CATALOG.entries().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "{:<48} {:<8} {:<9} {:<12} {:<22} {:<12}",
        "identifier", "code", "short", "model", "unit", "time axis"
    );
    for entry in PARAMETER_CATALOG.entries() {
        println!(
            "{:<48} {:<8} {:<9} {:<12} {:<22} {:<12}",
            entry.identifier(),
            entry.archive_code.unwrap_or("-"),
            entry.short_code,
            entry.model_name,
            entry.unit,
            entry.time_axis_name
        );
    }
    Ok(())
}

fn print_requests(config: &Path, all: bool) -> Result<()> {
    let config = RunConfig::from_file(config)
        .with_context(|| format!("Loading run configuration from {}", config.display()))?;
    let spec = config.request_spec()?;

    let requests = if all {
        spec.archive_requests()?
    } else {
        spec.pending_requests()?
    };
    println!("{}", serde_json::to_string_pretty(&requests)?);
    Ok(())
}

fn normalize(
    input: &Path,
    pattern: &str,
    output: &Path,
    format: OutputFormat,
    rules: Option<&Path>,
    variant: ModelVariant,
    time_axis: &str,
) -> Result<()> {
    if !NetcdfCodec::is_available() {
        bail!("normalize needs NetCDF support; rebuild rforce with `--features netcdf`");
    }

    let table = match rules {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Reading transform rules from {}", path.display()))?;
            TransformTable::from_toml_str(&contents)?
        }
        None => TransformTable::roms_bulk_flux_for(variant),
    };
    let normalizer = ForcingNormalizer::new(table).with_time_axis(time_axis);

    let codec = NetcdfCodec;
    let raw = open_mfdataset(&codec, input, pattern)
        .with_context(|| format!("Reading '{}' from {}", pattern, input.display()))?;
    let dataset = normalizer.normalize(&raw)?;
    codec
        .write(&dataset, output, format)
        .with_context(|| format!("Writing {}", output.display()))?;

    info!("Forcing written to {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match &args.command {
        Command::Catalog { json } => print_catalog(*json),
        Command::Request { config, all } => print_requests(config, *all),
        Command::Normalize {
            input,
            pattern,
            output,
            format,
            rules,
            variant,
            time_axis,
        } => normalize(
            input,
            pattern,
            output,
            *format,
            rules.as_deref(),
            *variant,
            time_axis,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_normalize_hidden_without_netcdf() {
        let command = Args::command();
        let normalize = command.find_subcommand("normalize").unwrap();
        assert_eq!(normalize.is_hide_set(), !NetcdfCodec::is_available());
    }

    #[cfg(not(feature = "netcdf"))]
    #[test]
    fn test_normalize_fails_fast_without_netcdf() {
        let err = normalize(
            Path::new("absent"),
            "*.nc",
            Path::new("forcing.nc"),
            OutputFormat::default(),
            None,
            ModelVariant::NetShortwaveModel,
            DEFAULT_TIME_AXIS,
        )
        .unwrap_err();
        assert!(err.to_string().contains("--features netcdf"));
    }

    #[test]
    fn test_normalize_variant_argument() {
        let args =
            Args::try_parse_from(["rforce", "normalize", "-i", "in", "-o", "out.nc"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Normalize {
                variant: ModelVariant::NetShortwaveModel,
                ..
            }
        ));

        let args = Args::try_parse_from([
            "rforce", "normalize", "-i", "in", "-o", "out.nc", "--variant", "kate",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Normalize {
                variant: ModelVariant::DownwardShortwaveModel,
                ..
            }
        ));

        let result = Args::try_parse_from([
            "rforce", "normalize", "-i", "in", "-o", "out.nc", "--rules", "rules.toml",
            "--variant", "kate",
        ]);
        assert!(result.is_err());
    }
}
