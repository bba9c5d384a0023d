// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layering configuration.
//!
//! Supports both programmatic and file-based configuration.

use crate::registry::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Instance name (for identification in logs).
    #[serde(default = "default_name")]
    pub name: String,

    /// Maximum number of layers a single descriptor may nest.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Default arguments per type.
    #[serde(default)]
    pub defaults: Vec<TypeDefaults>,
}

fn default_name() -> String {
    "hdds-layer".to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_depth: DEFAULT_MAX_DEPTH,
            log_level: default_log_level(),
            defaults: Vec::new(),
        }
    }
}

impl LayerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Example configuration written by `hdds-layer gen-config`.
    pub fn example() -> Self {
        Self {
            defaults: vec![TypeDefaults::new("xlt", ["in=cr", "out=lf"])],
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for (i, defaults) in self.defaults.iter().enumerate() {
            if defaults.type_name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Defaults entry {} has empty type name",
                    i
                )));
            }
            if !seen.insert(defaults.type_name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Defaults for '{}' given more than once",
                    defaults.type_name
                )));
            }
            if defaults.args.iter().any(|a| a.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "Defaults for '{}' contain an empty argument",
                    defaults.type_name
                )));
            }
        }

        Ok(())
    }

    /// Add default arguments for a type.
    pub fn add_defaults(&mut self, defaults: TypeDefaults) {
        self.defaults.push(defaults);
    }
}

/// Default arguments applied to every instance of a type.
///
/// Explicit descriptor arguments override defaults with the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefaults {
    /// Registered type name.
    pub type_name: String,

    /// Arguments (`key=value` or bare flags).
    #[serde(default)]
    pub args: Vec<String>,
}

impl TypeDefaults {
    /// Create defaults for `type_name`.
    pub fn new<I, S>(type_name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}
