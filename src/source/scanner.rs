use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// Collects the Rust sources of the documented application.
///
/// Hidden directories and build output are skipped. Files are returned in
/// path order so that repeated runs index them identically.
///
/// # Example
///
/// ```no_run
/// use openapi_from_rules::source::scanner::SourceScanner;
/// use std::path::Path;
///
/// let result = SourceScanner::new(Path::new("./my-app/src")).scan().unwrap();
/// println!("Found {} Rust files", result.files.len());
/// ```
pub struct SourceScanner {
    root: PathBuf,
}

/// Files found by a scan.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Every `.rs` file under the root, sorted
    pub files: Vec<PathBuf>,
    /// Paths that could not be read while walking
    pub warnings: Vec<String>,
}

impl SourceScanner {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Walk the tree below the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root itself does not exist. Unreadable
    /// entries below it are recorded as warnings.
    pub fn scan(&self) -> Result<ScanResult> {
        self.root
            .metadata()
            .with_context(|| format!("Source directory not accessible: {}", self.root.display()))?;

        let mut result = ScanResult::default();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.path() == self.root || !is_skipped(entry));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        result.files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    result.warnings.push(warning);
                }
            }
        }

        result.files.sort();
        debug!("Found {} Rust files under {}", result.files.len(), self.root.display());
        Ok(result)
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
}
