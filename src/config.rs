use crate::storage::{Issue, Organization, Repository};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::{io::ErrorKind, path::Path};
use tracing::warn;

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("Failed to read configuration file: {_0}")]
    Read(std::io::Error),
    #[display("Failed to parse configuration: {_0}")]
    Parse(toml::de::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub webhook: WebhookSettings,
    /// Entities the in-memory cache starts with.
    #[serde(default)]
    pub seed: Seed,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WebhookSettings {
    /// Largest accepted request body in bytes.
    ///
    /// (Default: `10485760`, i.e. 10 MiB)
    #[serde(default = "defaults::body_size_limit")]
    pub body_size_limit: usize,
    /// Drop events whose `issue_number` is not a valid integer instead of
    /// recording them against issue `0`.
    ///
    /// (Default: `false`)
    #[serde(default = "defaults::false_")]
    pub strict_issue_number: bool,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            body_size_limit: defaults::body_size_limit(),
            strict_issue_number: defaults::false_(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Seed {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl Config {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::parse(&content)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(ConfigError::Read(err)) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "Configuration file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            result => result,
        }
    }
}

mod defaults {
    pub fn body_size_limit() -> usize {
        crate::webhook::WEBHOOK_SIZE_LIMIT
    }

    pub fn false_() -> bool {
        false
    }
}
