use super::OutputFormat;
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Defaults read from `cli.toml`; command-line flags win over these.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    cache_size: Option<usize>,
    debug_level: Option<u8>,
    format: Option<OutputFormat>,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let format = match data.defaults.format.as_deref() {
            Some(value) => Some(OutputFormat::from_str(value, true).map_err(|_| {
                ConfigError::InvalidFormat {
                    value: value.to_string(),
                }
            })?),
            None => None,
        };
        Ok(Self {
            path,
            cache_size: data.defaults.cache_size,
            debug_level: data.defaults.debug_level,
            format,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn cache_size(&self) -> Option<usize> {
        self.cache_size
    }

    pub fn debug_level(&self) -> Option<u8> {
        self.debug_level
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.format
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    defaults: DefaultsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsSection {
    cache_size: Option<usize>,
    debug_level: Option<u8>,
    format: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("output format '{value}' in CLI config is invalid")]
    InvalidFormat { value: String },
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("genebank").join("cli.toml"))
}
