use crate::type_resolver::TypeResolver;
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds the Rust files that declare models.
///
/// The `target` directory and hidden directories are never entered. Files
/// are returned in file-name order so repeated scans of the same tree give
/// the same registry.
///
/// # Example
///
/// ```no_run
/// use swagger_from_routes::source::SourceScanner;
///
/// let files = SourceScanner::new("./src/models").scan().unwrap();
/// println!("Found {} model files", files.len());
/// ```
pub struct SourceScanner {
    root_path: PathBuf,
}

impl SourceScanner {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    /// Collect every `.rs` file below the root.
    ///
    /// Entries that cannot be read are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root_path.is_dir() {
            bail!("Model directory not found: {}", self.root_path.display());
        }

        let mut rust_files = Vec::new();
        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => warn!("Failed to access path: {}", e),
            }
        }

        debug!(
            "Found {} Rust files under {}",
            rust_files.len(),
            self.root_path.display()
        );
        Ok(rust_files)
    }
}

/// Read and parse one source file
pub fn parse_source(path: &Path) -> Result<syn::File> {
    debug!("Parsing file: {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    syn::parse_file(&content)
        .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))
}

/// Resolve the models declared under a directory.
///
/// Files with syntax errors are skipped with a warning, so one broken file
/// does not hide the models of the others.
pub fn load_models(dir: &Path) -> Result<TypeResolver> {
    let paths = SourceScanner::new(dir).scan()?;

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        match parse_source(path) {
            Ok(file) => files.push(file),
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    let resolver = TypeResolver::resolve(&files);
    info!(
        "Loaded {} models from {} of {} files in {}",
        resolver.registry().len(),
        files.len(),
        paths.len(),
        dir.display()
    );
    Ok(resolver)
}
