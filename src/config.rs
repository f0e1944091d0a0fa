//! Indexer configuration from `.scip-apex.yml` and command-line flags.
//!
//! Format:
//! ```yaml
//! source_dirs:
//!   - force-app/main/default
//! resolved: build/resolved.json
//! output: index.json
//! project_root: .
//! metadata_descriptors: true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = ".scip-apex.yml";

pub const DEFAULT_OUTPUT: &str = "index.json";

/// Partially specified settings. Every field is optional so that a config
/// file and flags can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    pub source_dirs: Vec<PathBuf>,
    pub resolved: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub metadata_descriptors: Option<bool>,
}

/// Fully resolved settings for one indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub source_dirs: Vec<PathBuf>,
    pub resolved: PathBuf,
    pub output: PathBuf,
    pub project_root: PathBuf,
    pub metadata_descriptors: bool,
    /// Command line recorded in the index metadata.
    pub arguments: Vec<String>,
}

impl IndexerConfig {
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Loads `dir/.scip-apex.yml` if present.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILENAME);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!("Using config {}", path.display());
        Self::load(&path).map(Some)
    }

    /// Layers `overrides` on top of `self`; set values in `overrides` win.
    pub fn merge(self, overrides: IndexerConfig) -> Self {
        Self {
            source_dirs: if overrides.source_dirs.is_empty() {
                self.source_dirs
            } else {
                overrides.source_dirs
            },
            resolved: overrides.resolved.or(self.resolved),
            output: overrides.output.or(self.output),
            project_root: overrides.project_root.or(self.project_root),
            metadata_descriptors: overrides.metadata_descriptors.or(self.metadata_descriptors),
        }
    }

    /// Applies defaults, resolving relative paths against `base`.
    pub fn into_options(self, base: &Path, arguments: Vec<String>) -> Result<Options> {
        let resolved = self.resolved.ok_or_else(|| {
            IndexerError::Config("no resolved program given (use --resolved)".to_string())
        })?;
        let absolute = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Ok(Options {
            source_dirs: self.source_dirs.into_iter().map(absolute).collect(),
            resolved: absolute(resolved),
            output: absolute(self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))),
            project_root: absolute(self.project_root.unwrap_or_default()),
            metadata_descriptors: self.metadata_descriptors.unwrap_or(true),
            arguments,
        })
    }
}
