//! Logger configuration.

use std::env::{self, VarError};
use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding the level threshold.
pub const LEVEL_VAR: &str = "KUBELOG_LEVEL";
/// Environment variable holding the record tag.
pub const TYPE_VAR: &str = "KUBELOG_TYPE";

pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;
pub const DEFAULT_TAG: &str = "log";

/// Level threshold and record tag for one logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LevelFilter,
    #[serde(rename = "type")]
    pub tag: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            tag: DEFAULT_TAG.to_string(),
        }
    }
}

impl LoggerConfig {
    pub fn new(level: LevelFilter, tag: &str) -> Self {
        Self {
            level,
            tag: tag.to_string(),
        }
    }

    /// Parse a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`,
    /// any case). An empty name means the default level.
    pub fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
        let level = level.trim();
        if level.is_empty() {
            return Ok(DEFAULT_LEVEL);
        }
        LevelFilter::from_str(level).map_err(|_| ConfigError::InvalidLevel(level.to_string()))
    }

    /// Read `KUBELOG_LEVEL` and `KUBELOG_TYPE`, defaulting what is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<String, VarError>,
    {
        let mut config = Self::default();

        match lookup(LEVEL_VAR) {
            Ok(level) => config.level = Self::parse_level(&level)?,
            Err(VarError::NotPresent) => {}
            Err(e) => {
                return Err(ConfigError::Env {
                    var: LEVEL_VAR,
                    reason: e.to_string(),
                })
            }
        }

        match lookup(TYPE_VAR) {
            Ok(tag) if !tag.is_empty() => config.tag = tag,
            Ok(_) | Err(VarError::NotPresent) => {}
            Err(e) => {
                return Err(ConfigError::Env {
                    var: TYPE_VAR,
                    reason: e.to_string(),
                })
            }
        }

        Ok(config)
    }
}
