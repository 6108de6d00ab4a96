//! Deterministic catalog construction from a discovery snapshot.
//!
//! Same `Discovery` in, same `AliasCatalog` out. Static entries are loaded
//! first and never touched; dynamic models are then named in source order
//! (local before remote, enumeration order within a source). A model whose
//! preferred name is taken walks a fixed fallback chain and is never dropped:
//!
//!   1. shortened name (only when no sibling in the same source shares it)
//!   2. base name (last path segment, tag removed)
//!   3. full qualified id
//!   4. `<base>-<vendor>` / `<base>-<provider>`
//!   5. `<4>-2`, `<4>-3`, ...

use std::collections::{BTreeMap, HashMap, HashSet};

use super::shorten::{base_name, shorten};
use super::{AliasCatalog, STATIC_ALIASES};
use crate::error::{AiError, Result};
use crate::providers::ProviderName;
use crate::providers::http::FREE_SUFFIX;

/// Model ids enumerated from one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceModels {
    pub provider: ProviderName,
    pub models: Vec<String>,
}

/// Everything the environment reported at refresh time.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Subprocess tools found on PATH.
    pub installed_tools: Vec<ProviderName>,
    /// Known (not enumerated) model lists for available providers.
    pub known_models: BTreeMap<ProviderName, Vec<String>>,
    /// Locally installed models, e.g. `ollama list`.
    pub local: Vec<SourceModels>,
    /// Remote API listings, unfiltered.
    pub remote: Vec<SourceModels>,
}

#[derive(Debug)]
pub struct BuiltCatalog {
    pub catalog: AliasCatalog,
    /// Model ids per provider, as shown by `ai list`.
    pub models: BTreeMap<ProviderName, Vec<String>>,
    pub installed_tools: Vec<ProviderName>,
    /// Remote entries excluded by provider policy.
    pub rejected: Vec<AiError>,
}

pub fn build(discovery: &Discovery) -> Result<BuiltCatalog> {
    let mut catalog = AliasCatalog::seed(STATIC_ALIASES)?;
    let mut models = discovery.known_models.clone();
    let mut rejected = Vec::new();

    for source in &discovery.local {
        let ids = dedup(&source.models);
        tracing::info!(provider = %source.provider, models = ids.len(), "local source");
        assign(&mut catalog, source.provider, &ids);
        merge_models(&mut models, source.provider, &ids);
    }

    for source in &discovery.remote {
        let (allowed, denied): (Vec<String>, Vec<String>) = dedup(&source.models)
            .into_iter()
            .partition(|id| permitted(source.provider, id));
        for id in denied {
            tracing::debug!(provider = %source.provider, model = %id, "skipping non-free model");
            rejected.push(AiError::Policy(format!(
                "{} model '{id}' is not free",
                source.provider
            )));
        }
        tracing::info!(provider = %source.provider, models = allowed.len(), "remote source");
        assign(&mut catalog, source.provider, &allowed);
        merge_models(&mut models, source.provider, &allowed);
    }

    Ok(BuiltCatalog {
        catalog,
        models,
        installed_tools: discovery.installed_tools.clone(),
        rejected,
    })
}

fn permitted(provider: ProviderName, id: &str) -> bool {
    provider != ProviderName::Openrouter || id.ends_with(FREE_SUFFIX)
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| !id.trim().is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn merge_models(models: &mut BTreeMap<ProviderName, Vec<String>>, provider: ProviderName, ids: &[String]) {
    let list = models.entry(provider).or_default();
    for id in ids {
        if !list.contains(id) {
            list.push(id.clone());
        }
    }
}

fn assign(catalog: &mut AliasCatalog, provider: ProviderName, ids: &[String]) {
    let mut group_sizes: HashMap<String, usize> = HashMap::new();
    for id in ids {
        *group_sizes.entry(shorten(id)).or_default() += 1;
    }

    for id in ids {
        let short = shorten(id);
        let base = base_name(id);
        let mut chain: Vec<&str> = Vec::with_capacity(3);
        if group_sizes.get(&short).copied() == Some(1) {
            chain.push(&short);
        }
        chain.push(base);
        chain.push(id);

        let alias = match chain.into_iter().find(|c| catalog.is_available(c)) {
            Some(name) => name.to_string(),
            None => disambiguate(catalog, provider, id),
        };
        tracing::trace!(%alias, %provider, model = %id, "dynamic alias");
        catalog.insert(&alias, provider, id);
    }
}

fn disambiguate(catalog: &AliasCatalog, provider: ProviderName, id: &str) -> String {
    let qualifier = id
        .rsplit_once('/')
        .and_then(|(path, _)| path.rsplit('/').next())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| provider.to_string());
    let stem: String = format!("{}-{qualifier}", base_name(id))
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    let stem = match stem.trim_start_matches('-') {
        "" => provider.to_string(),
        s => s.to_string(),
    };
    if catalog.is_available(&stem) {
        return stem;
    }
    (2..)
        .map(|n| format!("{stem}-{n}"))
        .find(|c| catalog.is_available(c))
        .unwrap_or(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(provider: ProviderName, ids: &[&str]) -> SourceModels {
        SourceModels {
            provider,
            models: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn target(built: &BuiltCatalog, alias: &str) -> (ProviderName, String) {
        let t = built.catalog.get(alias).unwrap();
        (t.provider, t.model.clone())
    }

    #[test]
    fn empty_discovery_is_static_table() {
        let built = build(&Discovery::default()).unwrap();
        assert_eq!(built.catalog, AliasCatalog::builtin());
        assert!(built.rejected.is_empty());
    }

    #[test]
    fn unique_short_names_used() {
        let d = Discovery {
            remote: vec![source(
                ProviderName::Openrouter,
                &["meta-llama/llama-3.3-70b-instruct:free", "qwen/qwen3-coder:free"],
            )],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        assert_eq!(
            target(&built, "llama"),
            (ProviderName::Openrouter, "meta-llama/llama-3.3-70b-instruct:free".into())
        );
        assert_eq!(target(&built, "qwen3-coder").1, "qwen/qwen3-coder:free");
    }

    #[test]
    fn shared_short_name_falls_back_to_base_names() {
        let d = Discovery {
            remote: vec![source(
                ProviderName::Openrouter,
                &[
                    "meta-llama/llama-3.3-70b-instruct:free",
                    "meta-llama/llama-3.2-3b-instruct:free",
                ],
            )],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        assert!(!built.catalog.contains("llama"));
        assert!(built.catalog.contains("llama-3.3-70b-instruct"));
        assert!(built.catalog.contains("llama-3.2-3b-instruct"));
    }

    #[test]
    fn static_aliases_never_displaced() {
        let d = Discovery {
            local: vec![source(ProviderName::Ollama, &["gemini:latest", "llama3"])],
            remote: vec![source(ProviderName::Openrouter, &["google/gemini-2.5-pro:free"])],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        assert_eq!(
            target(&built, "gemini"),
            (ProviderName::Gemini, "gemini-3-flash-preview".into())
        );
        assert_eq!(target(&built, "ollama"), (ProviderName::Ollama, "llama3".into()));
        assert_eq!(target(&built, "gemini:latest").0, ProviderName::Ollama);
        assert_eq!(target(&built, "gemini-2.5-pro").0, ProviderName::Openrouter);
        assert_eq!(target(&built, "llama3").0, ProviderName::Ollama);
    }

    #[test]
    fn reserved_words_skipped() {
        let d = Discovery {
            remote: vec![source(ProviderName::Openrouter, &["acme/chat-7b:free"])],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        assert!(!built.catalog.contains("chat"));
        assert_eq!(target(&built, "chat-7b").1, "acme/chat-7b:free");
    }

    #[test]
    fn exhausted_chain_is_disambiguated_not_dropped() {
        let d = Discovery {
            local: vec![source(ProviderName::Ollama, &["meta/llama:free"])],
            remote: vec![source(ProviderName::Openrouter, &["meta/llama:free"])],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        assert_eq!(target(&built, "llama").0, ProviderName::Ollama);
        assert_eq!(target(&built, "meta/llama:free").0, ProviderName::Openrouter);

        let d = Discovery {
            local: vec![
                source(ProviderName::Ollama, &["meta/llama:free"]),
                source(ProviderName::Ollama, &["meta/llama:free"]),
            ],
            remote: vec![source(ProviderName::Openrouter, &["meta/llama:free"])],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        assert_eq!(target(&built, "llama-meta").0, ProviderName::Openrouter);
    }

    #[test]
    fn paid_remote_models_rejected_with_policy_error() {
        let d = Discovery {
            remote: vec![source(
                ProviderName::Openrouter,
                &["openai/gpt-4o", "openai/gpt-oss-20b:free"],
            )],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        assert_eq!(built.rejected.len(), 1);
        assert!(matches!(built.rejected[0], AiError::Policy(_)));
        assert!(!built.catalog.iter().any(|(_, t)| t.model == "openai/gpt-4o"));
        assert_eq!(
            built.models[&ProviderName::Openrouter],
            vec!["openai/gpt-oss-20b:free".to_string()]
        );
    }

    #[test]
    fn build_is_deterministic() {
        let d = Discovery {
            installed_tools: vec![ProviderName::Claude, ProviderName::Ollama],
            local: vec![source(
                ProviderName::Ollama,
                &["qwen2.5-coder:7b", "qwen2.5-coder:14b", "llama3.2:latest"],
            )],
            remote: vec![source(
                ProviderName::Openrouter,
                &["qwen/qwen-2.5-coder-32b-instruct:free", "z-ai/glm-4.5-air:free"],
            )],
            ..Default::default()
        };
        let a = build(&d).unwrap();
        let b = build(&d).unwrap();
        assert_eq!(a.catalog, b.catalog);
        assert_eq!(a.models, b.models);
    }

    #[test]
    fn every_dynamic_model_gets_exactly_one_alias() {
        let ids = ["qwen2.5-coder:7b", "qwen2.5-coder:14b", "qwen2.5-coder:7b"];
        let d = Discovery {
            local: vec![source(ProviderName::Ollama, &ids)],
            ..Default::default()
        };
        let built = build(&d).unwrap();
        for id in ["qwen2.5-coder:7b", "qwen2.5-coder:14b"] {
            let n = built
                .catalog
                .iter()
                .filter(|(_, t)| t.provider == ProviderName::Ollama && t.model == id)
                .count();
            assert_eq!(n, 1, "{id}");
        }
    }
}
