//! On-disk configuration: alias catalog, discovered models, default alias and
//! runtime knobs, stored as one record under the ai-cli home directory.
//!
//! Lookup order for the file: `--config` flag, `$AI_CLI_CONFIG`,
//! `$AI_CLI_HOME/config.json`, `~/.ai-cli/config.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{AliasCatalog, BuiltCatalog, is_reserved};
use crate::chat::TruncationPolicy;
use crate::error::{AiError, Result};
use crate::providers::ProviderName;
use crate::storage;

pub const HOME_ENV: &str = "AI_CLI_HOME";
pub const CONFIG_ENV: &str = "AI_CLI_CONFIG";
const HOME_DIR_NAME: &str = ".ai-cli";
const CONFIG_FILE_NAME: &str = "config.json";
const CHATS_DIR_NAME: &str = "chats";

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Resolved filesystem locations.
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
    pub config: PathBuf,
}

impl Paths {
    pub fn resolve(config_override: Option<PathBuf>) -> Result<Self> {
        let home = match std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .map(|h| h.join(HOME_DIR_NAME))
                .ok_or_else(|| AiError::Config("cannot determine home directory".into()))?,
        };
        let config = config_override
            .or_else(|| {
                std::env::var_os(CONFIG_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| home.join(CONFIG_FILE_NAME));
        Ok(Self { home, config })
    }

    pub fn in_dir(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let config = home.join(CONFIG_FILE_NAME);
        Self { home, config }
    }

    pub fn chats_dir(&self) -> PathBuf {
        self.home.join(CHATS_DIR_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8765,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub installed_tools: Vec<ProviderName>,
    pub models: BTreeMap<ProviderName, Vec<String>>,
    pub aliases: AliasCatalog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_alias: Option<String>,
    pub chat: TruncationPolicy,
    pub timeout_secs: u64,
    /// Base command overrides for subprocess providers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<ProviderName, String>,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            installed_tools: Vec::new(),
            models: BTreeMap::new(),
            aliases: AliasCatalog::builtin(),
            default_alias: None,
            chat: TruncationPolicy::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            commands: BTreeMap::new(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or defaults seeded with the static aliases when absent.
    pub fn load(path: &Path) -> Result<Self> {
        let config = storage::read_record::<Config>(path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), aliases = config.aliases.len(), "config loaded");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        storage::write_record(path, self)?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn set_default(&mut self, alias: Option<&str>) -> Result<()> {
        match alias {
            None => self.default_alias = None,
            Some(a) if is_reserved(a) => {
                return Err(AiError::Usage(format!(
                    "'{a}' is a reserved command, cannot be used as default."
                )));
            }
            Some(a) if !self.aliases.contains(a) => {
                return Err(AiError::UnknownAlias(a.to_string()));
            }
            Some(a) => self.default_alias = Some(a.to_string()),
        }
        Ok(())
    }

    /// Replace catalog-derived fields with a fresh build. Returns the default
    /// alias that was cleared because it no longer exists, if any.
    pub fn apply_catalog(&mut self, built: BuiltCatalog) -> Option<String> {
        self.aliases = built.catalog;
        self.models = built.models;
        self.installed_tools = built.installed_tools;
        match &self.default_alias {
            Some(d) if !self.aliases.contains(d) => self.default_alias.take(),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.timeout_secs > 0).then(|| std::time::Duration::from_secs(self.timeout_secs))
    }
}
