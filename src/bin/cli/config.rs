use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stride::query::JoinStrategy;
use thiserror::Error;

use super::OutputFormat;

/// Settings read from `cli.toml`; every field is optional and command-line
/// flags take precedence.
#[derive(Debug, Default)]
pub struct CliConfig {
    data: RawConfig,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let required = explicit.is_some();
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            Some(config_path) if required => {
                return Err(ConfigError::Missing {
                    path: config_path.clone(),
                })
            }
            _ => RawConfig::default(),
        };
        Ok(Self { data })
    }

    pub fn join_strategy(&self) -> Option<JoinStrategy> {
        self.data.join_strategy
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.data.max_rows
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.data.format.map(OutputFormat::from)
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

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    join_strategy: Option<JoinStrategy>,
    #[serde(default)]
    max_rows: Option<usize>,
    #[serde(default)]
    format: Option<RawFormat>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum RawFormat {
    Text,
    Json,
}

impl From<RawFormat> for OutputFormat {
    fn from(value: RawFormat) -> Self {
        match value {
            RawFormat::Text => OutputFormat::Text,
            RawFormat::Json => OutputFormat::Json,
        }
    }
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
    #[error("CLI config {path} does not exist")]
    Missing { path: PathBuf },
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("stride").join("cli.toml"))
}
