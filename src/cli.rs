use crate::collaborators::Collaborators;
use crate::manifest::{Manifest, DEFAULT_MANIFEST_NAME};
use crate::openapi_builder::assemble_with_info;
use crate::serializer::{serialize, write_to_file, OutputFormat};
use crate::source::SourceIndex;
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

/// Generate an OpenAPI document from an application's validation rules,
/// resources and handler documentation
#[derive(Parser, Debug)]
#[command(name = "openapi-from-rules")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the application directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Application manifest (default: PROJECT_PATH/openapi-app.yaml)
    #[arg(short = 'm', long = "manifest", value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Directory of the Rust sources to index (default: PROJECT_PATH/src,
    /// or PROJECT_PATH itself when it has no src directory)
    #[arg(short = 's', long = "sources", value_name = "DIR")]
    pub sources: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| self.project_path.join(DEFAULT_MANIFEST_NAME))
    }

    pub fn sources_path(&self) -> PathBuf {
        if let Some(sources) = &self.sources {
            return sources.clone();
        }
        let src = self.project_path.join("src");
        if src.is_dir() {
            src
        } else {
            self.project_path.clone()
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    let manifest = args.manifest_path();
    if !manifest.is_file() {
        anyhow::bail!("Manifest not found: {}", manifest.display());
    }

    info!("Project path: {}", args.project_path.display());
    info!("Manifest: {}", manifest.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let manifest_path = args.manifest_path();
    let manifest = Manifest::from_path(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let sources = args.sources_path();
    info!("Indexing sources under {}...", sources.display());
    let index = SourceIndex::scan(&sources, manifest.conventions())?;

    info!("Building OpenAPI document...");
    let collaborators = Collaborators::new(&manifest, &index);
    let document = assemble_with_info(&collaborators, manifest.info().clone())
        .context("Failed to generate the OpenAPI document")?;

    let operations: usize = document
        .paths
        .values()
        .map(|item| item.operations().count())
        .sum();

    info!("Serializing to {:?} format...", args.output_format);
    let content = serialize(&document, args.output_format)?;

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Summary:");
    info!("  - Paths: {}", document.paths.len());
    info!("  - Operations: {}", operations);
    info!("  - Tags: {}", document.tags.len());

    Ok(())
}
