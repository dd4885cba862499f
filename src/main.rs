//! Command-line tool that generates an OpenAPI 3.0 document for an
//! application described by a manifest and its Rust sources.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-rules [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-rules ./shop -o openapi.yaml
//! ```
//!
//! Use a JSON manifest kept elsewhere and print JSON:
//! ```bash
//! openapi-from-rules ./shop -m config/openapi-app.json -f json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_rules::cli;

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

    info!("OpenAPI generator starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
