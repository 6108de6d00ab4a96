/*!
Provider names and their static descriptors.

Variants:
  claude / codex / gemini / qwen / ollama  (subprocess CLI tools)
  openrouter / glm                         (HTTP chat-completions APIs)

Helpers:
  - variants()
  - from_str_ci()
  - kind()
  - descriptor()
*/

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of backends the dispatcher can address.
#[derive(
    clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    /// Anthropic `claude` CLI
    Claude,
    /// OpenAI `codex` CLI
    Codex,
    /// Google `gemini` CLI
    Gemini,
    /// Alibaba `qwen` CLI
    Qwen,
    /// Local `ollama` models
    Ollama,
    /// OpenRouter HTTP API (free models only)
    Openrouter,
    /// Zhipu GLM HTTP API
    Glm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Subprocess,
    Http,
}

/// Static, process-wide facts about a provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    pub name: ProviderName,
    pub kind: ProviderKind,
    pub known_models: &'static [&'static str],
}

const DESCRIPTORS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        name: ProviderName::Claude,
        kind: ProviderKind::Subprocess,
        known_models: &["haiku", "sonnet", "opus"],
    },
    ProviderDescriptor {
        name: ProviderName::Codex,
        kind: ProviderKind::Subprocess,
        known_models: &[
            "gpt-5.3-codex",
            "gpt-5.2-codex",
            "gpt-5.1-codex-max",
            "gpt-5.1-codex-mini",
            "gpt-5.2",
        ],
    },
    ProviderDescriptor {
        name: ProviderName::Gemini,
        kind: ProviderKind::Subprocess,
        known_models: &[
            "gemini-3.1-pro-preview",
            "gemini-3-flash-preview",
            "gemini-2.5-pro",
            "gemini-2.5-flash",
            "gemini-2.5-flash-lite",
        ],
    },
    ProviderDescriptor {
        name: ProviderName::Qwen,
        kind: ProviderKind::Subprocess,
        known_models: &["coder-model", "vision-model"],
    },
    ProviderDescriptor {
        name: ProviderName::Ollama,
        kind: ProviderKind::Subprocess,
        known_models: &[],
    },
    ProviderDescriptor {
        name: ProviderName::Openrouter,
        kind: ProviderKind::Http,
        known_models: &[],
    },
    ProviderDescriptor {
        name: ProviderName::Glm,
        kind: ProviderKind::Http,
        known_models: &[
            "glm-5",
            "glm-4.7",
            "glm-4.6",
            "glm-4.5",
            "glm-4.5-air",
            "glm-4.5-x",
            "glm-4.5-airx",
            "glm-4.5-flash",
            "glm-4-32b-0414-128k",
        ],
    },
];

impl ProviderName {
    /// All variants, in registry order (also the listing order).
    pub const fn variants() -> &'static [ProviderName] {
        &[
            ProviderName::Claude,
            ProviderName::Codex,
            ProviderName::Gemini,
            ProviderName::Qwen,
            ProviderName::Ollama,
            ProviderName::Openrouter,
            ProviderName::Glm,
        ]
    }

    /// Case-insensitive parser not relying on `clap`, used by `provider:model` resolution.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        let norm = s.trim().to_ascii_lowercase();
        Self::variants()
            .iter()
            .copied()
            .find(|p| p.as_str() == norm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Claude => "claude",
            ProviderName::Codex => "codex",
            ProviderName::Gemini => "gemini",
            ProviderName::Qwen => "qwen",
            ProviderName::Ollama => "ollama",
            ProviderName::Openrouter => "openrouter",
            ProviderName::Glm => "glm",
        }
    }

    pub fn descriptor(&self) -> &'static ProviderDescriptor {
        DESCRIPTORS
            .iter()
            .find(|d| d.name == *self)
            .unwrap_or(&DESCRIPTORS[0])
    }

    pub fn kind(&self) -> ProviderKind {
        self.descriptor().kind
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(ProviderName::from_str_ci("CLAUDE"), Some(ProviderName::Claude));
        assert_eq!(
            ProviderName::from_str_ci(" OpenRouter "),
            Some(ProviderName::Openrouter)
        );
        assert_eq!(ProviderName::from_str_ci("glm"), Some(ProviderName::Glm));
        assert_eq!(ProviderName::from_str_ci("gpt"), None);
    }

    #[test]
    fn every_variant_has_its_own_descriptor() {
        for p in ProviderName::variants() {
            assert_eq!(p.descriptor().name, *p);
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(ProviderName::Ollama.kind(), ProviderKind::Subprocess);
        assert_eq!(ProviderName::Openrouter.kind(), ProviderKind::Http);
        assert_eq!(ProviderName::Glm.kind(), ProviderKind::Http);
    }

    #[test]
    fn display_round_trips() {
        for p in ProviderName::variants() {
            assert_eq!(ProviderName::from_str_ci(&p.to_string()), Some(*p));
        }
    }

    #[test]
    fn serde_lowercase() {
        let s = serde_json::to_string(&ProviderName::Openrouter).unwrap();
        assert_eq!(s, "\"openrouter\"");
    }
}
