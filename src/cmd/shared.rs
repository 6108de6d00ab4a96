/*!
shared.rs - helpers reused by the subcommands.

  - block_on: one multi-threaded runtime per invocation
  - load_config / chat_store / dispatcher: wiring from resolved Paths
  - read_piped_stdin: prompt text when stdin is not a terminal
  - effective_timeout: --timeout overrides the configured value (0 disables)
*/

use std::future::Future;
use std::io::{IsTerminal, Read};
use std::time::Duration;

use anyhow::{Context, Result};

use ai_cli::chat::ChatStore;
use ai_cli::config::{Config, Paths};
use ai_cli::dispatch::Dispatcher;
use ai_cli::providers::ProviderRegistry;

pub fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    Ok(rt.block_on(fut))
}

pub fn load_config(paths: &Paths) -> Result<Config> {
    Config::load(&paths.config)
        .with_context(|| format!("loading config from {}", paths.config.display()))
}

pub fn chat_store(paths: &Paths, config: &Config) -> ChatStore {
    ChatStore::new(paths.chats_dir(), config.chat)
}

pub fn dispatcher(config: &Config) -> Result<Dispatcher> {
    Ok(Dispatcher::new(ProviderRegistry::from_config(config)?))
}

pub fn effective_timeout(flag: Option<u64>, config: &Config) -> Option<Duration> {
    match flag {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.timeout(),
    }
}

/// Whole of stdin, trimmed, when it is piped and non-empty.
pub fn read_piped_stdin() -> Result<Option<String>> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin.read_to_string(&mut buf).context("reading prompt from stdin")?;
    let text = buf.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_flag_overrides_config() {
        let config = Config::default();
        assert_eq!(effective_timeout(Some(5), &config), Some(Duration::from_secs(5)));
        assert_eq!(effective_timeout(Some(0), &config), None);
        assert_eq!(effective_timeout(None, &config), config.timeout());
    }
}
