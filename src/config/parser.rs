//! Descriptor loader.
//!
//! This module handles loading deployment descriptors from JSON or YAML
//! files, with proper error reporting and `.env` support.

use crate::error::{ConfigError, Result, StackPlanError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::descriptor::DeploymentDescriptor;

/// Loader for deployment descriptors.
#[derive(Debug, Default)]
pub struct DescriptorLoader {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

/// Structured formats a descriptor can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// JSON (the default).
    Json,
    /// YAML.
    Yaml,
}

impl DescriptorFormat {
    /// Picks the format from a file extension; anything unrecognised is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

impl DescriptorLoader {
    /// Creates a new descriptor loader.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to locate the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a descriptor from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or not valid
    /// structured data.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DeploymentDescriptor> {
        let path = path.as_ref();
        info!("Loading descriptor from: {}", path.display());

        if !path.exists() {
            return Err(StackPlanError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StackPlanError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse(&content, DescriptorFormat::from_path(path), Some(path))
    }

    /// Parses a descriptor from a string in the given format.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid for the format.
    pub fn parse(
        &self,
        content: &str,
        format: DescriptorFormat,
        source: Option<&Path>,
    ) -> Result<DeploymentDescriptor> {
        debug!("Parsing {format:?} descriptor");

        let location = || source.map(|p| p.display().to_string());
        let descriptor: DeploymentDescriptor = match format {
            DescriptorFormat::Json => serde_json::from_str(content).map_err(|e| {
                StackPlanError::Config(ConfigError::ParseError {
                    message: format!("JSON parse error: {e}"),
                    location: location(),
                })
            })?,
            DescriptorFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                StackPlanError::Config(ConfigError::ParseError {
                    message: format!("YAML parse error: {e}"),
                    location: location(),
                })
            })?,
        };

        debug!(
            lambdas = descriptor.lambdas.len(),
            tables = descriptor.tables.len(),
            network = descriptor.vpc.is_some(),
            cluster = descriptor.eks.is_some(),
            "Parsed descriptor"
        );
        Ok(descriptor)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StackPlanError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default descriptor file names to search for.
pub const DEFAULT_DESCRIPTOR_FILES: &[&str] = &[
    "deploy.json",
    "deploy.yaml",
    "deploy.yml",
    "master-stack-config.json",
];

/// Finds a descriptor file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no descriptor file is found.
pub fn find_descriptor_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_DESCRIPTOR_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found descriptor file: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(StackPlanError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_DESCRIPTOR_FILES[0]),
    }))
}
