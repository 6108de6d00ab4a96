//! Environment probing: which CLI tools are installed, which local models
//! exist, what remote APIs advertise.
//!
//! An unreachable source contributes nothing; discovery itself never fails.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::build::{Discovery, SourceModels};
use crate::error::{AiError, Result};
use crate::providers::{HttpProvider, ProviderKind, ProviderName, ProviderRegistry};

const LIST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ModelSource: Send + Sync {
    async fn discover(&self) -> Discovery;
}

/// Probes the real machine through the provider registry.
pub struct SystemSource {
    registry: ProviderRegistry,
}

impl SystemSource {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ModelSource for SystemSource {
    async fn discover(&self) -> Discovery {
        let mut discovery = Discovery::default();
        let available = self.registry.available();

        for name in &available {
            let descriptor = name.descriptor();
            if descriptor.kind == ProviderKind::Subprocess {
                discovery.installed_tools.push(*name);
            }
            if !descriptor.known_models.is_empty() {
                discovery.known_models.insert(
                    *name,
                    descriptor.known_models.iter().map(|m| m.to_string()).collect(),
                );
            }
        }

        if available.contains(&ProviderName::Ollama) {
            match ollama_models().await {
                Ok(models) => discovery.local.push(SourceModels {
                    provider: ProviderName::Ollama,
                    models,
                }),
                Err(e) => tracing::warn!(error = %e, "could not list local ollama models"),
            }
        }

        if available.contains(&ProviderName::Openrouter) {
            match HttpProvider::builtin(ProviderName::Openrouter) {
                Ok(api) => match api.list_models().await {
                    Ok(models) => discovery.remote.push(SourceModels {
                        provider: ProviderName::Openrouter,
                        models,
                    }),
                    Err(e) => tracing::warn!(error = %e, "could not fetch openrouter models"),
                },
                Err(e) => tracing::warn!(error = %e, "openrouter client unavailable"),
            }
        }

        tracing::info!(
            tools = discovery.installed_tools.len(),
            local = discovery.local.iter().map(|s| s.models.len()).sum::<usize>(),
            remote = discovery.remote.iter().map(|s| s.models.len()).sum::<usize>(),
            "discovery finished"
        );
        discovery
    }
}

async fn ollama_models() -> Result<Vec<String>> {
    let mut cmd = Command::new("ollama");
    cmd.arg("list")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    let output = tokio::time::timeout(LIST_TIMEOUT, cmd.output())
        .await
        .map_err(|_| AiError::Timeout {
            provider: ProviderName::Ollama.to_string(),
            after: LIST_TIMEOUT,
        })?
        .map_err(|e| AiError::provider(ProviderName::Ollama, format!("failed to run 'ollama list': {e}")))?;
    if !output.status.success() {
        return Err(AiError::provider(
            ProviderName::Ollama,
            format!("'ollama list' exited with {}", output.status),
        ));
    }
    Ok(parse_ollama_list(&String::from_utf8_lossy(&output.stdout)))
}

/// First column of `ollama list`, header skipped.
pub fn parse_ollama_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
