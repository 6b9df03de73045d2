//! Configuration for term metadata storage and relationship expansion.
//!
//! Configuration can be loaded from:
//! - TOML files with a `[termeta]` root table
//! - Environment variables (`TERMETA_*` prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use termeta_core::config::TermMetaConfig;
//!
//! // Load from a file if it exists, otherwise from environment variables
//! let config = TermMetaConfig::load(std::path::Path::new("termeta.toml"))
//!     .expect("Failed to load config");
//!
//! // Or from environment variables only
//! let config = TermMetaConfig::from_env();
//! ```

use std::env;
use std::path::Path;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. `None` for hosts using an in-memory store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Maximum number of pooled connections.
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: Self::default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    fn default_max_connections() -> u32 {
        defaults::MAX_CONNECTIONS
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(url) = &self.url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(ConfigError::Validation(format!(
                    "database url must start with postgres:// or postgresql://, got: {}",
                    url
                )));
            }
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shadow record naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Prefix of shadow record names.
    #[serde(default = "RecordsConfig::default_prefix")]
    pub prefix: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
        }
    }
}

impl RecordsConfig {
    fn default_prefix() -> String {
        defaults::RECORD_PREFIX.to_string()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        // A prefix ending in a digit would let "p1" + "23" collide with "p12" + "3".
        match self.prefix.chars().last() {
            None => Err(ConfigError::Validation(
                "record prefix cannot be empty".to_string(),
            )),
            Some(c) if c.is_ascii_digit() => Err(ConfigError::Validation(format!(
                "record prefix cannot end in a digit: {}",
                self.prefix
            ))),
            Some(_) => Ok(()),
        }
    }
}

/// Relationship engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationsConfig {
    /// Maximum number of parent links followed from one term.
    #[serde(default = "RelationsConfig::default_max_parent_depth")]
    pub max_parent_depth: usize,
    /// Keep synonym entries left empty by stray commas.
    #[serde(default)]
    pub keep_empty_synonyms: bool,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            max_parent_depth: Self::default_max_parent_depth(),
            keep_empty_synonyms: defaults::KEEP_EMPTY_SYNONYMS,
        }
    }
}

impl RelationsConfig {
    fn default_max_parent_depth() -> usize {
        defaults::MAX_PARENT_DEPTH
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_parent_depth == 0 {
            return Err(ConfigError::Validation(
                "max_parent_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermMetaConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub relations: RelationsConfig,
}

impl TermMetaConfig {
    /// Load from `path` if it exists, falling back to environment variables.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            info!("Loading termeta config from: {}", path.display());
            Self::from_file(path)
        } else {
            debug!(
                "Config file not found at {}, using environment variables",
                path.display()
            );
            let config = Self::from_env();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text. `${VAR}` references are substituted
    /// from the environment first.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct TomlRoot {
            termeta: TermMetaConfig,
        }

        let content = Self::substitute_env_vars(content);
        let root: TomlRoot = toml::from_str(&content)?;
        root.termeta.validate()?;
        Ok(root.termeta)
    }

    /// Build configuration from `TERMETA_*` environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.database.url = env::var("TERMETA_DATABASE_URL").ok();
        if let Some(n) = parse_env("TERMETA_MAX_CONNECTIONS") {
            config.database.max_connections = n;
        }
        if let Ok(prefix) = env::var("TERMETA_RECORD_PREFIX") {
            config.records.prefix = prefix;
        }
        if let Some(depth) = parse_env("TERMETA_MAX_PARENT_DEPTH") {
            config.relations.max_parent_depth = depth;
        }
        if let Ok(v) = env::var("TERMETA_KEEP_EMPTY_SYNONYMS") {
            config.relations.keep_empty_synonyms = v == "true" || v == "1";
        }

        config
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.records.validate()?;
        self.relations.validate()?;
        Ok(())
    }

    /// Substitute environment variables in the format ${VAR_NAME}.
    ///
    /// Only upper-case names are expanded; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        let Ok(re) = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") else {
            return content.to_string();
        };
        re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}
