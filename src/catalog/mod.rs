//! Alias catalog: short human names mapped to `(provider, model)` pairs.
//!
//! Three sources feed it, in fixed precedence order: the static table below,
//! locally installed models, and remote API listings. Static entries are never
//! displaced; dynamic names are assigned by `build`.

pub mod build;
pub mod discover;
pub mod handle;
pub mod shorten;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::providers::ProviderName;

pub use build::{BuiltCatalog, Discovery, SourceModels, build};
pub use discover::{ModelSource, SystemSource};
pub use handle::{CatalogHandle, RefreshReport};
pub use shorten::shorten;

/// Command keywords that can never be aliases and stop greedy alias matching.
pub const RESERVED_COMMANDS: &[&str] = &[
    "init",
    "list",
    "default",
    "cmd",
    "json",
    "help",
    "yolo",
    "run",
    "completions",
    "serve",
    "chat",
    "reply",
];

pub fn is_reserved(token: &str) -> bool {
    RESERVED_COMMANDS.contains(&token)
}

/// Hand-maintained aliases. Order matters only for duplicate detection.
pub const STATIC_ALIASES: &[(&str, ProviderName, &str)] = &[
    ("claude", ProviderName::Claude, "sonnet"),
    ("haiku", ProviderName::Claude, "haiku"),
    ("sonnet", ProviderName::Claude, "sonnet"),
    ("opus", ProviderName::Claude, "opus"),
    ("codex", ProviderName::Codex, "gpt-5.3-codex"),
    ("gpt", ProviderName::Codex, "gpt-5.2"),
    ("codex-max", ProviderName::Codex, "gpt-5.1-codex-max"),
    ("codex-mini", ProviderName::Codex, "gpt-5.1-codex-mini"),
    ("gemini", ProviderName::Gemini, "gemini-3-flash-preview"),
    ("pro", ProviderName::Gemini, "gemini-3.1-pro-preview"),
    ("flash", ProviderName::Gemini, "gemini-3-flash-preview"),
    ("pro-2.5", ProviderName::Gemini, "gemini-2.5-pro"),
    ("flash-2.5", ProviderName::Gemini, "gemini-2.5-flash"),
    ("flash-lite", ProviderName::Gemini, "gemini-2.5-flash-lite"),
    ("qwen", ProviderName::Qwen, "coder-model"),
    ("qwen-vision", ProviderName::Qwen, "vision-model"),
    ("ollama", ProviderName::Ollama, "llama3"),
    ("glm", ProviderName::Glm, "glm-5"),
    ("glm5", ProviderName::Glm, "glm-5"),
    ("glm4", ProviderName::Glm, "glm-4.7"),
    ("glm-air", ProviderName::Glm, "glm-4.5-air"),
    ("mimo", ProviderName::Openrouter, "xiaomi/mimo-v2-flash:free"),
    ("olmo", ProviderName::Openrouter, "allenai/olmo-3.1-32b-think:free"),
    ("deepseek", ProviderName::Openrouter, "nex-agi/deepseek-v3.1-nex-n1:free"),
    ("chimera", ProviderName::Openrouter, "tngtech/deepseek-r1t2-chimera:free"),
    ("devstral", ProviderName::Openrouter, "mistralai/devstral-2512:free"),
    ("oss", ProviderName::Openrouter, "openai/gpt-oss-120b:free"),
];

/// Where an alias points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(ProviderName, String)", into = "(ProviderName, String)")]
pub struct AliasTarget {
    pub provider: ProviderName,
    pub model: String,
}

impl From<(ProviderName, String)> for AliasTarget {
    fn from((provider, model): (ProviderName, String)) -> Self {
        Self { provider, model }
    }
}

impl From<AliasTarget> for (ProviderName, String) {
    fn from(t: AliasTarget) -> Self {
        (t.provider, t.model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasEntry {
    pub alias: String,
    pub provider: ProviderName,
    pub model: String,
}

/// Alias name -> target. Names are unique; iteration is sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasCatalog {
    entries: BTreeMap<String, AliasTarget>,
}

impl AliasCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a static table and load it. Any bad row is fatal.
    pub fn seed(table: &[(&str, ProviderName, &str)]) -> Result<Self> {
        let mut catalog = Self::new();
        for (alias, provider, model) in table {
            if !is_valid_alias(alias) {
                return Err(AiError::Config(format!("static alias '{alias}' is not a valid name")));
            }
            if is_reserved(alias) {
                return Err(AiError::Config(format!(
                    "static alias '{alias}' collides with a reserved command"
                )));
            }
            if catalog.contains(alias) {
                return Err(AiError::Config(format!("static alias '{alias}' is defined twice")));
            }
            catalog.insert(alias, *provider, model);
        }
        Ok(catalog)
    }

    /// The compiled-in [`STATIC_ALIASES`] table, loaded without re-validation.
    /// Only this const table may go through here; its rows are checked by
    /// `static_table_is_valid`. Tables from anywhere else go through [`seed`].
    ///
    /// [`seed`]: AliasCatalog::seed
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (alias, provider, model) in STATIC_ALIASES {
            catalog.insert(alias, *provider, model);
        }
        catalog
    }

    pub(crate) fn insert(&mut self, alias: &str, provider: ProviderName, model: &str) {
        self.entries.insert(
            alias.to_string(),
            AliasTarget {
                provider,
                model: model.to_string(),
            },
        );
    }

    pub fn get(&self, alias: &str) -> Option<&AliasTarget> {
        self.entries.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Free for a new dynamic entry: valid, unreserved, unused.
    pub fn is_available(&self, alias: &str) -> bool {
        is_valid_alias(alias) && !is_reserved(alias) && !self.contains(alias)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AliasTarget)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> Vec<AliasEntry> {
        self.iter()
            .map(|(alias, t)| AliasEntry {
                alias: alias.to_string(),
                provider: t.provider,
                model: t.model.clone(),
            })
            .collect()
    }

    /// Entries grouped by provider, each group sorted by alias.
    pub fn by_provider(&self) -> BTreeMap<ProviderName, Vec<AliasEntry>> {
        let mut groups: BTreeMap<ProviderName, Vec<AliasEntry>> = BTreeMap::new();
        for entry in self.entries() {
            groups.entry(entry.provider).or_default().push(entry);
        }
        groups
    }
}

/// Non-empty, no whitespace, not starting with `-` (would read as a flag).
pub fn is_valid_alias(alias: &str) -> bool {
    !alias.is_empty() && !alias.starts_with('-') && !alias.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_table_is_valid() {
        let catalog = AliasCatalog::seed(STATIC_ALIASES).unwrap();
        assert_eq!(catalog.len(), STATIC_ALIASES.len());
        assert_eq!(catalog, AliasCatalog::builtin());
        let t = catalog.get("opus").unwrap();
        assert_eq!(t.provider, ProviderName::Claude);
        assert_eq!(t.model, "opus");
    }

    #[test]
    fn seed_rejects_reserved_and_duplicates() {
        let reserved = [("chat", ProviderName::Claude, "sonnet")];
        assert!(matches!(AliasCatalog::seed(&reserved), Err(AiError::Config(_))));
        let dup = [
            ("a", ProviderName::Claude, "sonnet"),
            ("a", ProviderName::Codex, "gpt-5.2"),
        ];
        assert!(matches!(AliasCatalog::seed(&dup), Err(AiError::Config(_))));
        let spaced = [("two words", ProviderName::Claude, "sonnet")];
        assert!(AliasCatalog::seed(&spaced).is_err());
    }

    #[test]
    fn availability_excludes_reserved_and_taken() {
        let catalog = AliasCatalog::builtin();
        assert!(!catalog.is_available("reply"));
        assert!(!catalog.is_available("sonnet"));
        assert!(!catalog.is_available(""));
        assert!(catalog.is_available("llama"));
    }

    #[test]
    fn grouped_by_provider() {
        let groups = AliasCatalog::builtin().by_provider();
        let claude: Vec<_> = groups[&ProviderName::Claude]
            .iter()
            .map(|e| e.alias.as_str())
            .collect();
        assert_eq!(claude, vec!["claude", "haiku", "opus", "sonnet"]);
    }
}
