//! Command-line tool that writes a Swagger 2.0 document for declared services.
//!
//! # Usage
//!
//! ```bash
//! swagger-from-routes [OPTIONS] <MANIFEST>
//! ```
//!
//! Generate YAML, reading models from Rust sources:
//! ```bash
//! swagger-from-routes api.yaml -m src/models -o swagger.yaml
//! ```
//!
//! Generate JSON with a title:
//! ```bash
//! swagger-from-routes api.yaml -f json -t "Pet Store" --api-version 2.0.1
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use swagger_from_routes::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("swagger-from-routes starting...");
    let args = cli::validate_args(args)?;
    cli::run(args)?;
    info!("Swagger document generation completed successfully");

    Ok(())
}
