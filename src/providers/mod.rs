//! Provider registry: one `Provider` implementation per `ProviderName`.
//!
//! The dispatch engine only ever sees `ProviderRegistry::get(name)` and the
//! `invoke` capability; how a provider turns a prompt into text (subprocess or
//! HTTP) stays behind the trait.

pub mod cli;
pub mod command;
pub mod http;
pub mod name;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{AiError, Result};

pub use cli::CliProvider;
pub use http::HttpProvider;
pub use name::{ProviderDescriptor, ProviderKind, ProviderName};

/// Per-call switches passed through verbatim to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Ask for structured (JSON) output.
    pub json_mode: bool,
    /// Let the tool apply edits without asking.
    pub auto_approve: bool,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> ProviderName;

    /// Installed (CLI on PATH) or configured (API key present).
    fn is_available(&self) -> bool;

    async fn invoke(&self, model: &str, prompt: &str, options: InvokeOptions) -> Result<String>;
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderName, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in provider, honoring `commands` overrides from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::empty();
        for name in ProviderName::variants() {
            let provider: Arc<dyn Provider> = match name.kind() {
                ProviderKind::Subprocess => {
                    let override_cmd = config.commands.get(name).map(String::as_str);
                    Arc::new(CliProvider::builtin(*name, override_cmd)?)
                }
                ProviderKind::Http => Arc::new(HttpProvider::builtin(*name)?),
            };
            registry.register(provider);
        }
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: ProviderName) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(&name)
            .cloned()
            .ok_or_else(|| AiError::provider(name, "provider is not registered"))
    }

    pub fn names(&self) -> Vec<ProviderName> {
        self.providers.keys().copied().collect()
    }

    pub fn available(&self) -> Vec<ProviderName> {
        self.providers
            .iter()
            .filter(|(_, p)| p.is_available())
            .map(|(n, _)| *n)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted providers for engine, chat and server tests.
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone)]
    pub enum Script {
        Reply(String),
        Fail(String),
        /// Sleep, then echo `model:prompt`.
        Sleep(Duration),
    }

    pub struct FakeProvider {
        name: ProviderName,
        scripts: BTreeMap<String, Script>,
        pub calls: Mutex<Vec<(String, String, InvokeOptions)>>,
    }

    impl FakeProvider {
        pub fn new(name: ProviderName) -> Self {
            Self {
                name,
                scripts: BTreeMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn script(mut self, model: &str, script: Script) -> Self {
            self.scripts.insert(model.to_string(), script);
            self
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> ProviderName {
            self.name
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn invoke(&self, model: &str, prompt: &str, options: InvokeOptions) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string(), options));
            match self.scripts.get(model) {
                Some(Script::Reply(text)) => Ok(text.clone()),
                Some(Script::Fail(msg)) => Err(AiError::provider(self.name, msg.clone())),
                Some(Script::Sleep(d)) => {
                    tokio::time::sleep(*d).await;
                    Ok(format!("{model}:{prompt}"))
                }
                None => Ok(format!("{model}:{prompt}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeProvider;
    use super::*;

    #[test]
    fn registry_lookup() {
        let registry =
            ProviderRegistry::empty().with(Arc::new(FakeProvider::new(ProviderName::Claude)));
        assert!(registry.get(ProviderName::Claude).is_ok());
        let err = registry.get(ProviderName::Glm).err().unwrap();
        assert!(matches!(err, AiError::Provider { .. }));
        assert_eq!(registry.available(), vec![ProviderName::Claude]);
    }

    #[test]
    fn builtin_registry_covers_every_provider() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.names(), ProviderName::variants().to_vec());
    }
}
