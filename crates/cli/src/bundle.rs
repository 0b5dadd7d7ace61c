//! Generation bundles.
//!
//! A bundle is one JSON document holding everything a generation run needs:
//! 1. **Subsystem:** The model, in the shape of [`SubsystemBuilder`](mmutest_core::SubsystemBuilder).
//! 2. **Settings:** Regions, page mask and preferred alignment.
//! 3. **Config:** Iteration mode, classifier, count limit and seed.
//! 4. **Accesses:** Access type and constraints of each access, in order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::fs;

use serde::Deserialize;
use thiserror::Error;

use mmutest_core::common::AccessType;
use mmutest_core::config::{EngineConfig, GeneratorSettings, MemoryAccessConstraints};
use mmutest_core::{MemoryEngine, Subsystem};

/// Failure to load or run a bundle.
#[derive(Debug, Error)]
pub enum CliError {
    /// The bundle file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Bundle path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The bundle is not valid JSON or describes an invalid model.
    #[error("invalid bundle {path}: {source}")]
    Parse {
        /// Bundle path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// The engine rejected the bundle.
    #[error(transparent)]
    Engine(#[from] mmutest_core::Error),
    /// A solution could not be written.
    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

/// One access of a bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessSpec {
    /// Operation and data width.
    #[serde(rename = "type")]
    pub ty: AccessType,
    /// Constraints on the access.
    #[serde(default)]
    pub constraints: MemoryAccessConstraints,
}

/// Everything a generation run needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    /// Memory subsystem model.
    pub subsystem: Subsystem,
    /// Generator settings.
    #[serde(default)]
    pub settings: GeneratorSettings,
    /// Engine configuration.
    #[serde(default)]
    pub config: EngineConfig,
    /// Accesses of every generated structure.
    pub accesses: Vec<AccessSpec>,
}

impl Bundle {
    /// Reads and validates a bundle file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or the model is invalid.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| CliError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a bundle from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the JSON error, which also carries model validation failures.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Access types and constraints in engine order.
    pub fn access_list(&self) -> Vec<(AccessType, MemoryAccessConstraints)> {
        self.accesses
            .iter()
            .map(|a| (a.ty, a.constraints.clone()))
            .collect()
    }

    /// Builds the engine for this bundle.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings are malformed or a constraint names an unknown
    /// buffer or variable.
    pub fn engine(self) -> Result<MemoryEngine, CliError> {
        let accesses = self.access_list();
        Ok(MemoryEngine::new(
            Arc::new(self.subsystem),
            self.settings,
            &self.config,
            accesses,
        )?)
    }
}
