//! Shared, swappable view of the persisted config.
//!
//! Readers take an `Arc<Config>` snapshot and never block on a rebuild. A
//! refresh builds a new config off to the side, persists it, and only then
//! swaps the pointer; concurrent refreshes are serialized.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::Mutex;

use super::build::build;
use super::discover::ModelSource;
use crate::config::Config;
use crate::error::Result;
use crate::providers::ProviderName;

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub aliases: usize,
    pub installed_tools: Vec<ProviderName>,
    pub models: usize,
    /// Remote entries excluded by provider policy.
    pub rejected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared_default: Option<String>,
}

pub struct CatalogHandle {
    path: PathBuf,
    current: RwLock<Arc<Config>>,
    rebuild: Mutex<()>,
}

impl CatalogHandle {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Config::load(&path)?;
        Ok(Self::with_config(path, config))
    }

    pub fn with_config(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(config)),
            rebuild: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<Config> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn swap(&self, next: Config) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(next);
    }

    /// Rediscover, rebuild, persist, swap. On any error the live config is untouched.
    pub async fn refresh(&self, source: &dyn ModelSource) -> Result<RefreshReport> {
        let _serial = self.rebuild.lock().await;

        let discovery = source.discover().await;
        let built = build(&discovery)?;
        let rejected = built.rejected.iter().map(ToString::to_string).collect();

        let mut next = (*self.snapshot()).clone();
        let cleared_default = next.apply_catalog(built);
        if let Some(alias) = &cleared_default {
            tracing::warn!(%alias, "default alias no longer exists, cleared");
        }
        next.save(&self.path)?;

        let report = RefreshReport {
            aliases: next.aliases.len(),
            installed_tools: next.installed_tools.clone(),
            models: next.models.values().map(Vec::len).sum(),
            rejected,
            cleared_default,
        };
        self.swap(next);
        tracing::info!(aliases = report.aliases, models = report.models, "catalog refreshed");
        Ok(report)
    }

    /// Apply an edit to a copy, persist it, then publish it.
    pub async fn update<F>(&self, edit: F) -> Result<Arc<Config>>
    where
        F: FnOnce(&mut Config) -> Result<()>,
    {
        let _serial = self.rebuild.lock().await;
        let mut next = (*self.snapshot()).clone();
        edit(&mut next)?;
        next.save(&self.path)?;
        self.swap(next);
        Ok(self.snapshot())
    }
}
