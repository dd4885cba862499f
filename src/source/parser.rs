use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// A Rust source file and its syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

impl ParsedFile {
    /// Parse source text that did not come from disk
    pub fn from_source(path: impl Into<PathBuf>, source: &str) -> Result<Self> {
        let path = path.into();
        let syntax_tree = syn::parse_file(source)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;
        Ok(Self { path, syntax_tree })
    }
}

/// Parses application sources with `syn`.
pub struct SourceParser;

impl SourceParser {
    /// Read and parse one file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid Rust.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        ParsedFile::from_source(path, &content)
    }

    /// Parse every file, skipping the ones that fail.
    ///
    /// A project with a few broken files still yields metadata for the rest.
    pub fn parse_all(paths: &[PathBuf]) -> Vec<ParsedFile> {
        let mut parsed = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::parse_file(path) {
                Ok(file) => parsed.push(file),
                Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
            }
        }

        debug!(
            "Parsing complete: {} succeeded, {} skipped",
            parsed.len(),
            paths.len() - parsed.len()
        );
        parsed
    }
}
